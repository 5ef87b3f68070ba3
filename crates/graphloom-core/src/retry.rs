//! Whole-run retry policy

use std::time::Duration;

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first; never less than 1
    pub max_attempts: u32,
    /// Fixed pause before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    /// 100 attempts, 10 seconds apart: enough to outlast a store that is
    /// still starting up next to the loader
    fn default() -> Self {
        Self {
            max_attempts: 100,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Retries without waiting, mainly for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// A single attempt with no retry
    pub fn no_retry() -> Self {
        Self::immediate(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_never_zero() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 100);
        assert_eq!(RetryPolicy::default().delay, Duration::from_secs(10));
    }
}
