//! Exponential-backoff reconnection logic for the realtime WebSocket
//! connection.
//!
//! When an established connection drops, the session calls
//! [`reconnect_loop`] to retry with increasing delays. Attempts are
//! bounded: once they are exhausted the session stops retrying and
//! requires an explicit `connect()` to resume.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, HubClient, HubConnection};

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Number of attempts before the session gives up.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

/// How a bounded reconnection run ended.
pub enum ReconnectOutcome {
    /// A connection was re-established.
    Reconnected(HubConnection),
    /// Every attempt failed; the session must not retry automatically.
    Exhausted,
    /// The server refused the handshake -- retrying cannot succeed.
    Rejected(ClientError),
    /// The cancellation token fired (explicit disconnect).
    Cancelled,
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Attempt to reconnect with exponential backoff, at most
/// [`ReconnectConfig::max_attempts`] times.
///
/// Each attempt waits out its backoff delay first, then tries to
/// connect. `on_attempt` is invoked with the attempt number before the
/// delay so the caller can surface `Reconnecting { attempt }` status.
pub async fn reconnect_loop(
    client: &HubClient,
    token: &str,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
    mut on_attempt: impl FnMut(u32),
) -> ReconnectOutcome {
    let mut delay = config.initial_delay;

    for attempt in 1..=config.max_attempts {
        on_attempt(attempt);
        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting to realtime server",
        );

        // Wait out the backoff delay, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => return ReconnectOutcome::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => return ReconnectOutcome::Cancelled,
            result = client.connect(token) => {
                match result {
                    Ok(conn) => {
                        tracing::info!(attempt, "Reconnected to realtime server");
                        return ReconnectOutcome::Reconnected(conn);
                    }
                    Err(e @ ClientError::HandshakeRejected { .. }) => {
                        // The server is reachable and said no; further
                        // attempts with the same token cannot succeed.
                        return ReconnectOutcome::Rejected(e);
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "Reconnect attempt {attempt} failed",
                        );
                    }
                }
            }
        }

        delay = next_delay(delay, config);
    }

    ReconnectOutcome::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = ReconnectConfig::default();
        let d = next_delay(Duration::from_secs(1), &config);
        assert_eq!(d, Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(8), &config);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn next_delay_already_at_max() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(30),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(30), &config);
        assert_eq!(d, Duration::from_secs(30));
    }

    #[test]
    fn custom_multiplier() {
        let config = ReconnectConfig {
            multiplier: 3.0,
            max_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(2), &config);
        assert_eq!(d, Duration::from_secs(6));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = ReconnectConfig::default();
        let mut delay = config.initial_delay;
        let expected = [1, 2, 4, 8, 16, 30, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[tokio::test]
    async fn cancellation_token_stops_reconnect() {
        let cancel = CancellationToken::new();
        // Cancel immediately -- reconnect_loop should return Cancelled
        // without trying to connect.
        cancel.cancel();

        let client = HubClient::new("ws://127.0.0.1:1/api/v1/ws");
        let config = ReconnectConfig::default();

        let outcome = reconnect_loop(&client, "token", &config, &cancel, |_| {}).await;
        assert!(matches!(outcome, ReconnectOutcome::Cancelled));
    }

    #[tokio::test]
    async fn bounded_attempts_exhaust() {
        let cancel = CancellationToken::new();
        // Nothing listens on port 1; every attempt fails fast.
        let client = HubClient::new("ws://127.0.0.1:1/api/v1/ws");
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
            max_attempts: 3,
        };

        let mut attempts = Vec::new();
        let outcome =
            reconnect_loop(&client, "token", &config, &cancel, |n| attempts.push(n)).await;

        assert!(matches!(outcome, ReconnectOutcome::Exhausted));
        assert_eq!(attempts, vec![1, 2, 3]);
    }
}
