//! Broker session (state machine)
//!
//! One connection, one channel, one anonymous queue, one binding.
//!
//! # State Machine
//!
//! ```text
//! Disconnected → connect() → Connected → open_channel() → ChannelOpen
//!   → declare_anonymous_queue() → QueueReady → bind() → Bound
//!   → start_consuming() → Consuming → close() → Disconnected
//! ```
//!
//! Calling an operation out of order fails without touching the broker.
//! [`BrokerSession::close`] is valid from every state and releases the
//! channel before the connection.

use lapin::options::{
    BasicConsumeOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, info, warn};
use u2a_core::error::{Result, U2aError};
use u2a_core::monitor::{emit, SessionEvent, SessionEventSender};
use u2a_core::options::ConsumerOptions;

use crate::source::LapinSource;

/// AMQP reply code for a normal close.
pub(crate) const REPLY_SUCCESS: u16 = 200;

/// Broker session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection held
    Disconnected,
    /// Connection established, no channel yet
    Connected,
    /// Channel open on the connection
    ChannelOpen,
    /// Anonymous queue declared
    QueueReady,
    /// Queue bound to the exchange
    Bound,
    /// Deliveries are flowing
    Consuming,
}

/// A single logical connection and channel to the broker.
pub struct BrokerSession {
    state: SessionState,
    connection: Option<Connection>,
    channel: Option<Channel>,
    queue: Option<String>,
    monitor: Option<SessionEventSender>,
}

impl BrokerSession {
    /// Connect to the broker.
    ///
    /// Fails with [`U2aError::Connection`] when the broker is unreachable or
    /// refuses the handshake.
    pub async fn connect(uri: &str, monitor: Option<SessionEventSender>) -> Result<Self> {
        debug!("[SESSION] Connecting to broker");
        let connection = match Connection::connect(uri, ConnectionProperties::default()).await {
            Ok(connection) => connection,
            Err(e) => {
                emit(
                    monitor.as_ref(),
                    SessionEvent::ConnectFailed {
                        reason: e.to_string(),
                    },
                );
                return Err(U2aError::connection(format!(
                    "unable to connect to AMQP server: {e}"
                )));
            }
        };

        let uri = redact(uri);
        info!("connected to AMQP server `{uri}`");
        emit(monitor.as_ref(), SessionEvent::Connected { uri });

        Ok(Self {
            state: SessionState::Connected,
            connection: Some(connection),
            channel: None,
            queue: None,
            monitor,
        })
    }

    /// Run the full setup sequence for a consumer: connect, open channel,
    /// apply prefetch, declare the anonymous queue and bind it.
    ///
    /// Anything acquired before a failing step is released before returning.
    pub async fn establish(
        options: &ConsumerOptions,
        monitor: Option<SessionEventSender>,
    ) -> Result<Self> {
        let mut session = Self::connect(&options.uri, monitor).await?;

        let prepared = async {
            session.open_channel().await?;
            if let Some(prefetch) = options.prefetch {
                session.set_prefetch(prefetch).await?;
            }
            session.declare_anonymous_queue().await?;
            session.bind(&options.exchange, &options.routing_key).await
        }
        .await;

        match prepared {
            Ok(()) => Ok(session),
            Err(e) => {
                emit(
                    session.monitor.as_ref(),
                    SessionEvent::ConnectFailed {
                        reason: e.to_string(),
                    },
                );
                session.close().await;
                Err(e)
            }
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Name the broker gave the anonymous queue, once declared.
    pub fn queue_name(&self) -> Option<&str> {
        self.queue.as_deref()
    }

    /// Open the session's only channel.
    pub async fn open_channel(&mut self) -> Result<()> {
        self.expect_state(SessionState::Connected, "open a channel")?;
        let connection = self.connection()?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| U2aError::connection(format!("unable to open channel: {e}")))?;
        debug!(channel_id = channel.id(), "[SESSION] Channel open");

        self.channel = Some(channel);
        self.state = SessionState::ChannelOpen;
        emit(self.monitor.as_ref(), SessionEvent::ChannelOpened);
        Ok(())
    }

    /// Limit unacknowledged deliveries in flight on the channel.
    pub async fn set_prefetch(&mut self, prefetch: u16) -> Result<()> {
        self.expect_state(SessionState::ChannelOpen, "set prefetch")?;
        self.channel()?
            .basic_qos(prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| U2aError::broker(format!("basic.qos failed: {e}")))?;
        debug!(prefetch, "[SESSION] Prefetch applied");
        Ok(())
    }

    /// Declare a server-named, exclusive, non-durable, auto-delete queue.
    pub async fn declare_anonymous_queue(&mut self) -> Result<&str> {
        self.expect_state(SessionState::ChannelOpen, "declare a queue")?;

        let queue = self
            .channel()?
            .queue_declare(
                "",
                QueueDeclareOptions {
                    passive: false,
                    durable: false,
                    exclusive: true,
                    auto_delete: true,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| U2aError::broker(format!("queue.declare failed: {e}")))?;

        let name = queue.name().as_str().to_string();
        debug!(queue = %name, "[SESSION] Anonymous queue declared");
        emit(
            self.monitor.as_ref(),
            SessionEvent::QueueDeclared {
                queue: name.clone(),
            },
        );

        self.state = SessionState::QueueReady;
        Ok(self.queue.insert(name).as_str())
    }

    /// Bind the queue to `exchange` with `routing_key`.
    ///
    /// The exchange must already exist ([`U2aError::Bind`] otherwise). The
    /// default exchange (empty name) cannot be bound; it already routes by
    /// queue name, so no binding is issued for it.
    pub async fn bind(&mut self, exchange: &str, routing_key: &str) -> Result<()> {
        self.expect_state(SessionState::QueueReady, "bind")?;
        let queue = self
            .queue
            .clone()
            .ok_or_else(|| U2aError::broker("no queue declared"))?;

        if exchange.is_empty() {
            debug!("[SESSION] Default exchange, no binding issued");
        } else {
            let channel = self.channel()?;

            channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Direct,
                    ExchangeDeclareOptions {
                        passive: true,
                        ..ExchangeDeclareOptions::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| U2aError::bind(exchange, e.to_string()))?;

            channel
                .queue_bind(
                    &queue,
                    exchange,
                    routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| U2aError::bind(exchange, e.to_string()))?;
        }

        info!("bound to exchange `{exchange}` with routing key `{routing_key}`");
        emit(
            self.monitor.as_ref(),
            SessionEvent::Bound {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
            },
        );
        self.state = SessionState::Bound;
        Ok(())
    }

    /// Start consuming with manual acknowledgment.
    pub async fn start_consuming(&mut self) -> Result<LapinSource> {
        self.expect_state(SessionState::Bound, "start consuming")?;
        let queue = self
            .queue
            .clone()
            .ok_or_else(|| U2aError::broker("no queue declared"))?;

        let consumer = self
            .channel()?
            .basic_consume(
                &queue,
                "",
                BasicConsumeOptions {
                    no_ack: false,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| U2aError::broker(format!("basic.consume failed: {e}")))?;

        let source = LapinSource::new(consumer);
        let consumer_tag = source.consumer_tag();
        debug!(consumer_tag = %consumer_tag, "[SESSION] Consuming");
        emit(
            self.monitor.as_ref(),
            SessionEvent::Consuming { consumer_tag },
        );

        self.state = SessionState::Consuming;
        Ok(source)
    }

    /// Release the channel, then the connection.
    ///
    /// Valid from every state. Close failures are logged, not returned: the
    /// handles are gone either way.
    pub async fn close(mut self) {
        if let Some(channel) = self.channel.take() {
            if channel.status().connected() {
                if let Err(e) = channel.close(REPLY_SUCCESS, "OK").await {
                    warn!("closing channel failed: {e}");
                }
            }
        }
        if let Some(connection) = self.connection.take() {
            if connection.status().connected() {
                if let Err(e) = connection.close(REPLY_SUCCESS, "OK").await {
                    warn!("closing connection failed: {e}");
                }
            }
        }

        self.queue = None;
        self.state = SessionState::Disconnected;
        debug!("[SESSION] Closed");
        emit(self.monitor.as_ref(), SessionEvent::Disconnected);
    }

    fn expect_state(&self, expected: SessionState, operation: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(U2aError::broker(format!(
                "cannot {operation} in state {:?} (expected {expected:?})",
                self.state
            )))
        }
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| U2aError::broker("connection released"))
    }

    fn channel(&self) -> Result<&Channel> {
        self.channel
            .as_ref()
            .ok_or_else(|| U2aError::broker("channel released"))
    }
}

impl std::fmt::Debug for BrokerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerSession")
            .field("state", &self.state)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

/// Strip the password from a broker URI before it reaches the logs.
pub fn redact(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let (authority, path) = rest.split_at(authority_end);

    match authority.rsplit_once('@') {
        Some((userinfo, host)) => {
            let user = userinfo.split_once(':').map_or(userinfo, |(user, _)| user);
            format!("{scheme}://{user}:***@{host}{path}")
        }
        None => uri.to_string(),
    }
}
