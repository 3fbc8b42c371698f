//! Fixed-window rate limiter for the ceremony endpoints
//!
//! Process-local and deliberately approximate: the goal is coarse abuse
//! mitigation, not billing-grade accounting. Windows are independent per key,
//! expired windows are lazily replaced on the next check, and a periodic
//! sweep drops stale entries.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub ok: bool,
    /// Calls left in the current window (zero once the limit is exceeded).
    pub remaining: u32,
    /// Seconds until the window resets; meaningful when `ok` is false.
    pub retry_after: u64,
}

#[derive(Debug)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Shared limiter instance; clone freely, all clones count against the same
/// windows.
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one call against `key`'s current window.
    pub async fn check(&self, key: &str, limit: u32, window: Duration) -> Decision {
        let mut windows = self.windows.write().await;
        let now = Instant::now();

        match windows.get_mut(key) {
            Some(entry) if now < entry.reset_at => {
                entry.count = entry.count.saturating_add(1);
                Decision {
                    ok: entry.count <= limit,
                    remaining: limit.saturating_sub(entry.count),
                    retry_after: entry.reset_at.saturating_duration_since(now).as_secs(),
                }
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + window,
                    },
                );
                Decision {
                    ok: limit >= 1,
                    remaining: limit.saturating_sub(1),
                    retry_after: window.as_secs(),
                }
            }
        }
    }

    /// Drop windows that have already reset.
    pub async fn sweep(&self) {
        let mut windows = self.windows.write().await;
        let now = Instant::now();
        windows.retain(|_, entry| now < entry.reset_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);

        for expected_remaining in [2, 1, 0] {
            let d = limiter.check("auth:1.2.3.4", 3, window).await;
            assert!(d.ok);
            assert_eq!(d.remaining, expected_remaining);
        }

        let d = limiter.check("auth:1.2.3.4", 3, window).await;
        assert!(!d.ok);
        assert_eq!(d.remaining, 0);
    }

    #[tokio::test]
    async fn windows_are_independent_per_key() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);

        assert!(!limiter.check("a", 0, window).await.ok);
        assert!(limiter.check("b", 1, window).await.ok);
    }

    #[tokio::test]
    async fn expired_window_resets_the_count() {
        let limiter = RateLimiter::new();
        let window = Duration::from_millis(50);

        for _ in 0..3 {
            limiter.check("key", 3, window).await;
        }
        assert!(!limiter.check("key", 3, window).await.ok);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let d = limiter.check("key", 3, window).await;
        assert!(d.ok);
        assert_eq!(d.remaining, 2);
    }

    #[tokio::test]
    async fn sweep_drops_only_stale_entries() {
        let limiter = RateLimiter::new();

        limiter.check("stale", 5, Duration::from_millis(10)).await;
        limiter.check("live", 5, Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.sweep().await;

        let windows = limiter.windows.read().await;
        assert!(!windows.contains_key("stale"));
        assert!(windows.contains_key("live"));
    }
}
