use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::RefreshConfig;

/// Floor for the base interval so a misconfigured policy cannot spin.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Ceiling for both the base interval and the jitter window.
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// When the next live status poll is due.
///
/// Each poll lands `base + U[0, jitter]` after the previous one finished,
/// which spreads viewers that reconnect together across the jitter window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshPolicy {
    base: Duration,
    jitter: Duration,
}

impl RefreshPolicy {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        let policy = Self {
            base: base.clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL),
            jitter: jitter.min(MAX_REFRESH_INTERVAL),
        };
        if policy.base != base || policy.jitter != jitter {
            tracing::warn!(
                base_secs = policy.base.as_secs(),
                jitter_secs = policy.jitter.as_secs(),
                "refresh interval out of range, clamped"
            );
        }
        policy
    }

    /// A policy without jitter.
    pub fn fixed(interval: Duration) -> Self {
        Self::new(interval, Duration::ZERO)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    pub fn next_delay(&self) -> Duration {
        let spread = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if spread == 0 {
            return self.base;
        }
        let offset = rand::thread_rng().gen_range(0..=spread);
        self.base.saturating_add(Duration::from_millis(offset))
    }

    pub fn next_refresh_at(&self, now: Instant) -> Instant {
        let delay = self.next_delay();
        now.checked_add(delay)
            .or_else(|| now.checked_add(MIN_REFRESH_INTERVAL))
            .unwrap_or(now)
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshConfig::default().into()
    }
}

impl From<RefreshConfig> for RefreshPolicy {
    fn from(config: RefreshConfig) -> Self {
        Self::new(config.base, config.jitter)
    }
}

/// A spawned task that is aborted when cancelled or dropped.
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Captured when a consumer attaches to a subject; results produced under
/// an older token are not applied to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectToken {
    epoch: u64,
    team_id: String,
}

impl SubjectToken {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }
}

/// Owns a consumer's single refresh task and its subject epoch.
///
/// Attaching to a subject cancels the previous task before the new one is
/// spawned, so a consumer never has more than one pending timer.
#[derive(Default)]
pub struct RefreshScheduler {
    epoch: AtomicU64,
    task: Mutex<Option<ScheduledTask>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the current task, open a new epoch for `team_id` and spawn
    /// the task `start` builds for it.
    ///
    /// `start` runs with the scheduler locked, so consumer state it resets
    /// cannot be overwritten by a late result of the previous subject.
    pub fn attach<F, Fut>(&self, team_id: &str, start: F) -> SubjectToken
    where
        F: FnOnce(SubjectToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut task = self.lock_task();
        if let Some(previous) = task.take() {
            previous.cancel();
        }
        let token = SubjectToken {
            epoch: self.epoch.fetch_add(1, Ordering::SeqCst) + 1,
            team_id: team_id.to_string(),
        };
        *task = Some(ScheduledTask::spawn(start(token.clone())));
        tracing::debug!(team_id, epoch = token.epoch, "attached refresh task");
        token
    }

    /// Cancel the current task and invalidate every outstanding token.
    pub fn detach(&self) {
        let mut task = self.lock_task();
        if let Some(previous) = task.take() {
            previous.cancel();
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, token: &SubjectToken) -> bool {
        token.epoch == self.epoch.load(Ordering::SeqCst)
    }

    /// Whether a task is attached and still running.
    pub fn is_active(&self) -> bool {
        self.lock_task().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Run `apply` only if `token` is still current. Holding the task lock
    /// keeps a concurrent `attach` from slipping in between the check and
    /// the update.
    pub fn apply_if_current(&self, token: &SubjectToken, apply: impl FnOnce()) -> bool {
        let _task = self.lock_task();
        if !self.is_current(token) {
            tracing::debug!(
                team_id = token.team_id(),
                epoch = token.epoch,
                "discarding result for a stale subject"
            );
            return false;
        }
        apply();
        true
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<ScheduledTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
