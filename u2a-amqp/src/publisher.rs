//! Publishing side of the broker, used by the bridge.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, info, warn};
use u2a_core::error::{Result, U2aError};
use u2a_core::options::BridgeOptions;

use crate::session::{redact, REPLY_SUCCESS};

/// Sends one payload to the broker.
#[async_trait(?Send)]
pub trait Publisher {
    /// Publish `payload` as a single message.
    async fn publish(&self, payload: &[u8]) -> Result<()>;
}

/// Publishes to a fixed exchange and routing key.
pub struct ExchangePublisher {
    connection: Connection,
    channel: Channel,
    exchange: String,
    routing_key: String,
}

impl ExchangePublisher {
    /// Connect, open a channel and declare the target exchange.
    ///
    /// A non-empty exchange is declared durable and of kind `direct`; the
    /// declaration is idempotent when it already exists with those
    /// properties. The default exchange (empty name) is used as is.
    pub async fn connect(options: &BridgeOptions) -> Result<Self> {
        let connection = Connection::connect(&options.amqp_uri, ConnectionProperties::default())
            .await
            .map_err(|e| U2aError::connection(format!("unable to connect to AMQP server: {e}")))?;
        info!("connected to AMQP server `{}`", redact(&options.amqp_uri));

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close) = connection.close(REPLY_SUCCESS, "OK").await {
                    warn!("closing connection failed: {close}");
                }
                return Err(U2aError::connection(format!("unable to open channel: {e}")));
            }
        };

        let publisher = Self {
            connection,
            channel,
            exchange: options.exchange.clone(),
            routing_key: options.routing_key.clone(),
        };

        if !publisher.exchange.is_empty() {
            if let Err(e) = publisher.declare_exchange().await {
                publisher.close().await;
                return Err(e);
            }
        }
        Ok(publisher)
    }

    async fn declare_exchange(&self) -> Result<()> {
        self.channel
            .exchange_declare(
                &self.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| U2aError::broker(format!("exchange.declare `{}` failed: {e}", self.exchange)))?;
        debug!(exchange = %self.exchange, "exchange declared");
        Ok(())
    }

    /// Target exchange name.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Close the channel, then the connection.
    pub async fn close(self) {
        if let Err(e) = self.channel.close(REPLY_SUCCESS, "OK").await {
            warn!("closing channel failed: {e}");
        }
        if let Err(e) = self.connection.close(REPLY_SUCCESS, "OK").await {
            warn!("closing connection failed: {e}");
        }
    }
}

#[async_trait(?Send)]
impl Publisher for ExchangePublisher {
    async fn publish(&self, payload: &[u8]) -> Result<()> {
        // No confirm mode: the returned confirmation is always NotRequested.
        self.channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| U2aError::broker(format!("basic.publish failed: {e}")))?;
        Ok(())
    }
}

impl std::fmt::Debug for ExchangePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangePublisher")
            .field("exchange", &self.exchange)
            .field("routing_key", &self.routing_key)
            .finish_non_exhaustive()
    }
}
