//! Exponential backoff for reconnect attempts.

/// Default maximum number of reconnect attempts before a transport settles
/// into `Closed` (`reconnectMaxAttempts` in the configuration knobs table).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default base delay in milliseconds (`reconnectBaseDelayMs`).
pub const DEFAULT_BASE_DELAY_MS: u64 = 250;

/// Computes the backoff delay for the given 1-based `attempt` number:
/// `baseDelay * 2^(attempt - 1)`.
///
/// `attempt` is clamped to at least `1` so callers can't request a
/// negative-exponent shift.
pub fn backoff_delay_ms(attempt: u32, base_delay_ms: u64) -> u64 {
    let attempt = attempt.max(1);
    let shift = (attempt - 1).min(63);
    base_delay_ms.saturating_mul(1u64 << shift)
}

/// Whether `attempt` (1-based, the attempt about to be made) is still
/// within `max_attempts`.
pub fn attempts_remaining(attempt: u32, max_attempts: u32) -> bool {
    attempt <= max_attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_each_attempt() {
        assert_eq!(backoff_delay_ms(1, 250), 250);
        assert_eq!(backoff_delay_ms(2, 250), 500);
        assert_eq!(backoff_delay_ms(3, 250), 1000);
        assert_eq!(backoff_delay_ms(5, 250), 4000);
    }

    #[test]
    fn attempts_remaining_respects_max() {
        assert!(attempts_remaining(5, DEFAULT_MAX_ATTEMPTS));
        assert!(!attempts_remaining(6, DEFAULT_MAX_ATTEMPTS));
    }
}
