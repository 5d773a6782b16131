//! Reconnection utilities with exponential backoff support.
//!
//! The consumer and the bridge both rebuild their broker session after a
//! recoverable failure. The delay starts at a base interval, doubles on each
//! consecutive failure and is capped at a maximum.

use std::time::Duration;

use crate::options::{BridgeOptions, ConsumerOptions};

/// Base delay used by the bridge, which only configures a ceiling.
pub const BRIDGE_BASE_INTERVAL: Duration = Duration::from_millis(100);

/// Reconnection state tracker for managing connection attempts and backoff.
///
/// # Example
///
/// ```rust
/// use u2a_core::reconnect::ReconnectState;
/// use std::time::Duration;
///
/// let mut reconnect = ReconnectState::new(
///     Duration::from_millis(100),
///     Duration::from_secs(10),
///     None,
/// );
///
/// // First attempt uses base interval
/// assert_eq!(reconnect.next_delay(), Some(Duration::from_millis(100)));
///
/// // Subsequent attempts use exponential backoff
/// assert_eq!(reconnect.next_delay(), Some(Duration::from_millis(200)));
/// assert_eq!(reconnect.next_delay(), Some(Duration::from_millis(400)));
///
/// // Reset on successful connection
/// reconnect.reset();
/// assert_eq!(reconnect.next_delay(), Some(Duration::from_millis(100)));
/// ```
#[derive(Debug, Clone)]
pub struct ReconnectState {
    /// Base reconnection interval
    base_interval: Duration,
    /// Maximum reconnection interval
    max_interval: Duration,
    /// Attempt limit (`None` = unlimited)
    max_attempts: Option<u32>,
    /// Current reconnection attempt (0 = first attempt)
    attempt: u32,
    /// Current backoff interval
    current_interval: Duration,
}

impl ReconnectState {
    /// Create a new reconnection state tracker.
    ///
    /// A `max_interval` below `base_interval` pins every delay to the base.
    pub fn new(base_interval: Duration, max_interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            base_interval,
            max_interval: max_interval.max(base_interval),
            max_attempts,
            attempt: 0,
            current_interval: base_interval,
        }
    }

    /// Backoff policy of the robust consumer.
    pub fn for_consumer(options: &ConsumerOptions) -> Self {
        Self::new(
            options.reconnect_ivl,
            options.reconnect_ivl_max,
            options.max_reconnect_attempts,
        )
    }

    /// Backoff policy of the bridge: `min(limit, 100ms * 2^retries)`.
    pub fn for_bridge(options: &BridgeOptions) -> Self {
        Self::new(BRIDGE_BASE_INTERVAL, options.reconnect_delay_limit, None)
    }

    /// Get the delay for the next reconnection attempt.
    ///
    /// Returns `None` once the attempt limit is reached. The delay doubles
    /// with each attempt until it reaches the maximum interval.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        let delay = self.current_interval;

        self.attempt += 1;
        self.current_interval = self
            .base_interval
            .saturating_mul(1_u32 << self.attempt.min(16))
            .min(self.max_interval);

        Some(delay)
    }

    /// Reset the reconnection state after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current_interval = self.base_interval;
    }

    /// Whether the attempt limit has been reached.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_attempts.is_some_and(|max| self.attempt >= max)
    }

    /// Get the current attempt number.
    #[inline]
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Get the base reconnection interval.
    #[inline]
    #[must_use]
    pub const fn base_interval(&self) -> Duration {
        self.base_interval
    }

    /// Get the maximum reconnection interval.
    #[inline]
    #[must_use]
    pub const fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Get the current reconnection interval.
    #[inline]
    #[must_use]
    pub const fn current_interval(&self) -> Duration {
        self.current_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Option<Duration> {
        Some(Duration::from_millis(millis))
    }

    #[test]
    fn test_exponential_backoff() {
        let mut state = ReconnectState::new(
            Duration::from_millis(100),
            Duration::from_secs(10),
            None,
        );

        assert_eq!(state.next_delay(), ms(100));
        assert_eq!(state.attempt(), 1);
        assert_eq!(state.next_delay(), ms(200));
        assert_eq!(state.next_delay(), ms(400));
        assert_eq!(state.next_delay(), ms(800));
        assert_eq!(state.attempt(), 4);
    }

    #[test]
    fn test_max_interval_cap() {
        let mut state = ReconnectState::new(
            Duration::from_millis(100),
            Duration::from_millis(500),
            None,
        );

        assert_eq!(state.next_delay(), ms(100));
        assert_eq!(state.next_delay(), ms(200));
        assert_eq!(state.next_delay(), ms(400));
        assert_eq!(state.next_delay(), ms(500));
        assert_eq!(state.next_delay(), ms(500));
    }

    #[test]
    fn test_attempt_limit() {
        let mut state = ReconnectState::new(
            Duration::from_millis(10),
            Duration::from_millis(100),
            Some(2),
        );

        assert_eq!(state.next_delay(), ms(10));
        assert_eq!(state.next_delay(), ms(20));
        assert!(state.is_exhausted());
        assert_eq!(state.next_delay(), None);

        state.reset();
        assert!(!state.is_exhausted());
        assert_eq!(state.next_delay(), ms(10));
    }

    #[test]
    fn test_many_attempts_do_not_overflow() {
        let mut state = ReconnectState::new(
            Duration::from_millis(100),
            Duration::from_secs(60),
            None,
        );
        for _ in 0..100 {
            assert!(state.next_delay().unwrap() <= Duration::from_secs(60));
        }
        assert_eq!(state.current_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_bridge_policy() {
        let options = BridgeOptions::new("0.0.0.0:9000", "amqp://localhost")
            .with_reconnect_delay_limit(Duration::from_millis(350));
        let mut state = ReconnectState::for_bridge(&options);

        assert_eq!(state.base_interval(), BRIDGE_BASE_INTERVAL);
        assert_eq!(state.next_delay(), ms(100));
        assert_eq!(state.next_delay(), ms(200));
        assert_eq!(state.next_delay(), ms(350));
    }

    #[test]
    fn test_consumer_policy() {
        let options = ConsumerOptions::default()
            .with_reconnect_ivl(Duration::from_millis(250))
            .with_reconnect_ivl_max(Duration::from_secs(5))
            .with_max_reconnect_attempts(Some(3));
        let state = ReconnectState::for_consumer(&options);

        assert_eq!(state.base_interval(), Duration::from_millis(250));
        assert_eq!(state.max_interval(), Duration::from_secs(5));
        assert_eq!(state.current_interval(), Duration::from_millis(250));
        assert_eq!(state.attempt(), 0);
    }
}
