//! Fixed-window request quota, e.g. MyMemory's 1000 free requests per day.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl QuotaConfig {
    pub fn per_day(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug)]
struct Window {
    started_at: Instant,
    used: u32,
}

#[derive(Debug)]
pub struct RequestQuota {
    config: QuotaConfig,
    window: Mutex<Window>,
}

impl RequestQuota {
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            config,
            window: Mutex::new(Window {
                started_at: Instant::now(),
                used: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn roll(&self, window: &mut Window) {
        if window.started_at.elapsed() >= self.config.window {
            window.started_at = Instant::now();
            window.used = 0;
        }
    }

    /// Consume one request from the current window.
    ///
    /// # Returns
    /// `false` when the window is exhausted; nothing is consumed then.
    pub fn try_consume(&self) -> bool {
        let mut window = self.lock();
        self.roll(&mut window);
        if window.used >= self.config.max_requests {
            return false;
        }
        window.used += 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        let mut window = self.lock();
        self.roll(&mut window);
        self.config.max_requests.saturating_sub(window.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_day() {
        let config = QuotaConfig::per_day(1000);
        assert_eq!(config.max_requests, 1000);
        assert_eq!(config.window, Duration::from_secs(86_400));
    }

    #[test]
    fn test_consume_until_exhausted() {
        let quota = RequestQuota::new(QuotaConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
        });

        assert!(quota.try_consume());
        assert_eq!(quota.remaining(), 1);
        assert!(quota.try_consume());
        assert!(!quota.try_consume());
        assert_eq!(quota.remaining(), 0);
    }

    #[test]
    fn test_window_rolls_over() {
        let quota = RequestQuota::new(QuotaConfig {
            max_requests: 1,
            window: Duration::from_millis(20),
        });

        assert!(quota.try_consume());
        assert!(!quota.try_consume());

        std::thread::sleep(Duration::from_millis(30));
        assert!(quota.try_consume());
    }

    #[test]
    fn test_zero_quota_never_admits() {
        let quota = RequestQuota::new(QuotaConfig {
            max_requests: 0,
            window: Duration::from_secs(60),
        });
        assert!(!quota.try_consume());
    }
}
