//! Exponential reconnect backoff with jitter, capped at 30 seconds.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    base: Duration,
    cap: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            attempt: 0,
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }

    /// Returns the delay for the current attempt and advances the counter.
    /// `base * 2^attempt`, capped, with up to 20% jitter to avoid a thundering
    /// herd of reconnecting clients landing on the same instant.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.base.saturating_mul(1u32 << self.attempt.min(10));
        let capped = exp.min(self.cap);
        self.attempt = self.attempt.saturating_add(1);

        let jitter_frac: f64 = rand::thread_rng().gen_range(0.0..0.2);
        capped + Duration::from_secs_f64(capped.as_secs_f64() * jitter_frac)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_then_caps() {
        let mut backoff = Backoff::new();
        let first = backoff.next_delay();
        let second = backoff.next_delay();
        assert!(second >= first);

        for _ in 0..20 {
            let delay = backoff.next_delay();
            assert!(delay <= Duration::from_secs(36));
        }
    }

    #[test]
    fn reset_returns_to_base_delay() {
        let mut backoff = Backoff::new();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        let delay = backoff.next_delay();
        assert!(delay < Duration::from_secs(2));
    }
}
