use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::live_status::LiveStatusSnapshot;
use crate::models::{LiveStatusEntry, Member};
use crate::roster_cache::RosterSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortMode {
    #[default]
    #[serde(rename = "a-z")]
    AlphaAsc,
    #[serde(rename = "z-a")]
    AlphaDesc,
    #[serde(rename = "live-asc")]
    LiveViewersAsc,
    #[serde(rename = "live-desc")]
    LiveViewersDesc,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [
        SortMode::AlphaAsc,
        SortMode::AlphaDesc,
        SortMode::LiveViewersAsc,
        SortMode::LiveViewersDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::AlphaAsc => "a-z",
            SortMode::AlphaDesc => "z-a",
            SortMode::LiveViewersAsc => "live-asc",
            SortMode::LiveViewersDesc => "live-desc",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown sort mode '{s}' (expected a-z, z-a, live-asc or live-desc)"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    pub search_text: String,
    pub sort_mode: SortMode,
}

/// A member ready to display: match spans for highlighting and the live
/// stream if they are broadcasting.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredMember<'a> {
    pub member: &'a Member,
    pub spans: Vec<Range<usize>>,
    pub live: Option<&'a LiveStatusEntry>,
}

/// Search and order a roster for display. Pure: same inputs, same output.
///
/// An empty search keeps every member; otherwise only label matches
/// remain. Live sorts always put live members first, ordered by viewers,
/// with offline members after them alphabetically.
pub fn apply<'a>(
    roster: &'a RosterSnapshot,
    live: Option<&'a LiveStatusSnapshot>,
    params: &FilterParams,
) -> Vec<FilteredMember<'a>> {
    let lookup = |member: &Member| live.and_then(|s| s.get(&member.id));

    let mut rows: Vec<FilteredMember<'a>> = if params.search_text.is_empty() {
        roster
            .members
            .iter()
            .map(|member| FilteredMember {
                member,
                spans: Vec::new(),
                live: lookup(member),
            })
            .collect()
    } else {
        roster
            .search(&params.search_text)
            .into_iter()
            .map(|(member, spans)| FilteredMember {
                member,
                spans,
                live: lookup(member),
            })
            .collect()
    };

    match params.sort_mode {
        SortMode::AlphaAsc => {
            rows.sort_by(|a, b| locale_cmp(&a.member.login, &b.member.login));
            rows
        }
        SortMode::AlphaDesc => {
            rows.sort_by(|a, b| locale_cmp(&b.member.login, &a.member.login));
            rows
        }
        SortMode::LiveViewersAsc => sort_by_live_status(rows, true),
        SortMode::LiveViewersDesc => sort_by_live_status(rows, false),
    }
}

fn sort_by_live_status(rows: Vec<FilteredMember<'_>>, ascending: bool) -> Vec<FilteredMember<'_>> {
    let (mut live, mut offline): (Vec<_>, Vec<_>) = rows.into_iter().partition(|r| r.live.is_some());

    let viewers = |row: &FilteredMember<'_>| row.live.map_or(0, |s| s.viewer_count);
    live.sort_by(|a, b| {
        let ord = viewers(a).cmp(&viewers(b));
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    offline.sort_by(|a, b| locale_cmp(&a.member.login, &b.member.login));

    live.extend(offline);
    live
}

/// Locale-style string ordering: punctuation before digits before letters,
/// letters without regard to case, then lowercase before uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(collation_key)
        .cmp(b.chars().map(collation_key))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

fn collation_key(c: char) -> (u8, char) {
    let class = if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    };
    (class, c.to_lowercase().next().unwrap_or(c))
}
