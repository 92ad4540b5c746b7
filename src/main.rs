use std::ops::Range;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;

use team_roster::auth::{AuthContext, AuthEvents};
use team_roster::config::Config;
use team_roster::engine::Engine;
use team_roster::filter::{FilterParams, SortMode};
use team_roster::helix::HelixClient;
use team_roster::manager::TeamManager;
use team_roster::models::TeamInfo;
use team_roster::scheduler::RefreshPolicy;
use team_roster::view::{RosterDisplay, RosterRow, TeamView};

#[derive(Parser)]
#[command(name = "team-roster")]
#[command(about = "Show a broadcaster's team roster with live status")]
struct Cli {
    /// Broadcaster whose teams are listed. Defaults to TEAM_ROSTER_CHANNEL_ID.
    #[arg(long)]
    channel_id: Option<String>,
    /// Show this team instead of the channel's first team.
    #[arg(long)]
    team: Option<String>,
    #[arg(long, default_value = "")]
    search: String,
    /// One of a-z, z-a, live-asc, live-desc.
    #[arg(long, default_value_t = SortMode::AlphaAsc)]
    sort: SortMode,
    /// Keep polling and reprint on every change until interrupted.
    #[arg(long, default_value_t = false)]
    watch: bool,
    #[arg(long, default_value_t = false)]
    json: bool,
    #[arg(long)]
    client_id: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    helix_url: Option<String>,
}

impl Cli {
    fn merge_into(&self, config: &mut Config) {
        if let Some(ref url) = self.helix_url {
            config.helix_url = url.trim_end_matches('/').to_string();
        }
        if self.client_id.is_some() {
            config.client_id.clone_from(&self.client_id);
        }
        if self.token.is_some() {
            config.helix_token.clone_from(&self.token);
        }
        if self.channel_id.is_some() {
            config.channel_id.clone_from(&self.channel_id);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "team_roster=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    cli.merge_into(&mut config);

    let auth = match auth_context(&config, cli.team.is_some()) {
        Ok(auth) => auth,
        Err(missing) => {
            eprintln!("  \x1b[31mmissing {missing}\x1b[0m (flag or TEAM_ROSTER_* env var)");
            return ExitCode::from(2);
        }
    };

    if !cli.json {
        print_banner(&config, &cli);
    }

    let source = Arc::new(HelixClient::new(&config.helix_url));
    let engine = Engine::new(source, RefreshPolicy::from(config.refresh));
    let auth_events = AuthEvents::new();
    let manager = TeamManager::new(engine, &auth_events);
    manager.view().set_filter(FilterParams {
        search_text: cli.search.clone(),
        sort_mode: cli.sort,
    });
    auth_events.set(auth);

    match cli.team.as_deref() {
        Some(team_id) => manager.view().set_team(Some(team_id)),
        None => {
            let teams = manager.load().await;
            if teams.is_empty() {
                eprintln!("  \x1b[33mchannel is not on any team\x1b[0m");
                return ExitCode::FAILURE;
            }
            if !cli.json {
                for team in teams.iter() {
                    eprintln!("  \x1b[2mteam\x1b[0m         {} ({})", team.team_display_name, team.id);
                }
                eprintln!();
            }
        }
    }

    watch_view(manager.view(), &cli).await
}

fn auth_context(config: &Config, has_team: bool) -> Result<AuthContext, &'static str> {
    let client_id = config.client_id.clone().ok_or("client id")?;
    let helix_token = config.helix_token.clone().ok_or("helix token")?;
    let channel_id = match config.channel_id.clone() {
        Some(id) => id,
        None if has_team => String::new(),
        None => return Err("channel id"),
    };
    Ok(AuthContext {
        channel_id,
        client_id,
        helix_token,
    })
}

async fn watch_view(view: &TeamView, cli: &Cli) -> ExitCode {
    let mut changes = view.subscribe();
    loop {
        match view.display() {
            RosterDisplay::Idle | RosterDisplay::Loading => {}
            RosterDisplay::Unavailable => {
                eprintln!("  \x1b[31mteam roster unavailable\x1b[0m");
                return ExitCode::FAILURE;
            }
            RosterDisplay::Ready {
                team,
                live_count,
                rows,
                ..
            } => {
                // Without live status the first frame would show everyone offline.
                if view.live_status().is_some() {
                    print_roster(&team, live_count, &rows, cli.json);
                    if !cli.watch {
                        view.shutdown();
                        return ExitCode::SUCCESS;
                    }
                }
            }
        }

        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    return ExitCode::SUCCESS;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                view.shutdown();
                return ExitCode::SUCCESS;
            }
        }
    }
}

#[derive(Serialize)]
struct RosterOutput<'a> {
    team: &'a TeamInfo,
    live_count: usize,
    members: &'a [RosterRow],
}

fn print_roster(team: &TeamInfo, live_count: usize, rows: &[RosterRow], json: bool) {
    if json {
        let output = RosterOutput {
            team,
            live_count,
            members: rows,
        };
        match serde_json::to_string(&output) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!("failed to encode roster: {e}"),
        }
        return;
    }

    println!(
        "\x1b[1m{}\x1b[0m \x1b[2m{} members, {live_count} live\x1b[0m",
        team.display_name,
        rows.len()
    );
    let now = Utc::now();
    for row in rows {
        let label = highlight(row.member.label(), &row.spans);
        match row.live {
            Some(ref stream) => println!(
                "  \x1b[31m●\x1b[0m {label}  \x1b[2m{} viewers · {} · {}\x1b[0m",
                stream.viewer_count,
                stream.game_name,
                format_uptime(stream.uptime(now))
            ),
            None => println!("    {label}"),
        }
    }
    println!();
}

fn format_uptime(uptime: chrono::Duration) -> String {
    let minutes = uptime.num_minutes();
    if minutes < 60 {
        format!("{minutes}m")
    } else {
        format!("{}h{:02}m", minutes / 60, minutes % 60)
    }
}

/// Bold the matched characters of `label`.
fn highlight(label: &str, spans: &[Range<usize>]) -> String {
    if spans.is_empty() {
        return label.to_string();
    }
    let mut out = String::with_capacity(label.len() + spans.len() * 8);
    for (i, c) in label.chars().enumerate() {
        if spans.iter().any(|s| s.start == i) {
            out.push_str("\x1b[1m");
        }
        out.push(c);
        if spans.iter().any(|s| s.end == i + 1) {
            out.push_str("\x1b[0m");
        }
    }
    out
}

fn print_banner(config: &Config, cli: &Cli) {
    let version = env!("CARGO_PKG_VERSION");
    let build = env!("BUILD_SHA");

    eprintln!();
    eprintln!("  \x1b[1;36mteam-roster\x1b[0m \x1b[2mv{version} ({build})\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mhelix\x1b[0m        {}", config.helix_url);
    if let Some(ref channel_id) = config.channel_id {
        eprintln!("  \x1b[2mchannel\x1b[0m      {channel_id}");
    }
    eprintln!(
        "  \x1b[2mrefresh\x1b[0m      {}s + up to {}s",
        config.refresh.base.as_secs(),
        config.refresh.jitter.as_secs()
    );
    eprintln!("  \x1b[2msort\x1b[0m         {}", cli.sort);
    if !cli.search.is_empty() {
        eprintln!("  \x1b[2msearch\x1b[0m       {}", cli.search);
    }
    eprintln!();
}
