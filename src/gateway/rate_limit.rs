use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Admission control keyed by an opaque caller identifier.
///
/// Implementations are process-scoped singletons with an explicit
/// construction point. The guarantee is best-effort per instance; nothing
/// is coordinated across processes.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Returns true when the request is admitted.
    async fn check(&self, identifier: &str) -> bool;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
        }
    }
}

fn default_max_requests() -> u32 {
    30
}

fn default_window_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window counter: the window resets wholesale once `reset_at`
/// passes; there is no sliding credit. Records are never evicted, so the
/// map holds one entry per identifier ever seen.
pub struct FixedWindowLimiter {
    settings: RateLimitSettings,
    records: Mutex<HashMap<String, WindowRecord>>,
}

impl FixedWindowLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            records: Mutex::new(HashMap::new()),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_millis(self.settings.window_ms)
    }

    /// Time-parameterized admission check; `check` feeds in `Instant::now`.
    /// The read-check-increment runs under a single map lock, so concurrent
    /// checks for the same identifier cannot lose increments.
    async fn check_at(&self, identifier: &str, now: Instant) -> bool {
        let mut records = self.records.lock().await;
        match records.get_mut(identifier) {
            Some(record) if now <= record.reset_at => {
                if record.count < self.settings.max_requests {
                    record.count += 1;
                    true
                } else {
                    false
                }
            }
            _ => {
                records.insert(
                    identifier.to_string(),
                    WindowRecord {
                        count: 1,
                        reset_at: now + self.window(),
                    },
                );
                true
            }
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check(&self, identifier: &str) -> bool {
        self.check_at(identifier, Instant::now()).await
    }
}
