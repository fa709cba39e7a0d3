use std::time::Duration;

/// Exponential backoff between attempts of a callback submission.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy which tries exactly once.
    pub fn no_retry() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        }
    }

    /// Delay to wait after the given failed attempt, counting from 1.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent: i32 = attempt.saturating_sub(1).min(32) as i32;
        let delay: f64 = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}
