//! Session event monitoring.
//!
//! Provides event streams for tracking consumer and bridge lifecycle events
//! like connections, bindings and disconnections.

use std::fmt;

/// Broker session lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connection to the broker established.
    Connected { uri: String },

    /// Channel opened on the connection.
    ChannelOpened,

    /// Anonymous queue declared by the broker.
    QueueDeclared { queue: String },

    /// Queue bound to an exchange.
    Bound { exchange: String, routing_key: String },

    /// Consumption started.
    Consuming { consumer_tag: String },

    /// Channel and connection released.
    Disconnected,

    /// Connection or setup attempt failed.
    ConnectFailed { reason: String },

    /// A new session will be attempted after a delay.
    Reconnecting { attempt: u32, delay_ms: u64 },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { uri } => write!(f, "Connected to {uri}"),
            Self::ChannelOpened => write!(f, "Channel opened"),
            Self::QueueDeclared { queue } => write!(f, "Queue {queue} declared"),
            Self::Bound {
                exchange,
                routing_key,
            } => write!(f, "Bound to exchange `{exchange}` with key `{routing_key}`"),
            Self::Consuming { consumer_tag } => write!(f, "Consuming as {consumer_tag}"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::ConnectFailed { reason } => write!(f, "Connect failed: {reason}"),
            Self::Reconnecting { attempt, delay_ms } => {
                write!(f, "Reconnecting in {delay_ms}ms (attempt {attempt})")
            }
        }
    }
}

/// Handle for receiving session events.
pub type SessionMonitor = flume::Receiver<SessionEvent>;

/// Sender half used by sessions to emit events.
pub type SessionEventSender = flume::Sender<SessionEvent>;

/// Creates a new monitoring channel pair.
#[must_use]
pub fn create_monitor() -> (SessionEventSender, SessionMonitor) {
    flume::unbounded()
}

/// Emit an event if a monitor is attached.
///
/// A dropped receiver is not an error: monitoring is best-effort.
#[inline]
pub fn emit(sender: Option<&SessionEventSender>, event: SessionEvent) {
    if let Some(sender) = sender {
        let _ = sender.send(event);
    }
}
