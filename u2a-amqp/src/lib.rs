//! # u2a AMQP
//!
//! Broker side of u2a, built on `lapin`.
//!
//! ## Consumer
//!
//! ```text
//! RobustConsumer ──► BrokerSession ──► LapinSource ──► QueueConsumer ──► DeliveryHandler
//!   (backoff)        (connect, queue,    (deliveries)    (ack after        (stdout)
//!                     bind, consume)                      success)
//! ```
//!
//! Each session owns one connection, one channel and one server-named,
//! exclusive, auto-delete queue bound to the configured exchange. A
//! delivery is acknowledged only after its handler returned `Ok`.
//!
//! ## Publisher
//!
//! [`ExchangePublisher`] sends raw payloads to a durable direct exchange and
//! is what the UDP bridge forwards datagrams through.
//!
//! ```rust,no_run
//! use u2a_amqp::prelude::*;
//! use u2a_core::prelude::*;
//!
//! #[compio::main]
//! async fn main() -> u2a_core::error::Result<()> {
//!     let options = ConsumerOptions::default()
//!         .with_exchange("events")
//!         .with_routing_key("udp");
//!     let mut consumer = RobustConsumer::new(options, StdoutHandler::stdout());
//!     let report = consumer.run(&Shutdown::never()).await?;
//!     println!("acknowledged {}", report.acknowledged);
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod consumer;
pub mod handler;
pub mod publisher;
pub mod robust;
pub mod session;
pub mod source;

pub use consumer::{ConsumeEnd, ConsumeReport, QueueConsumer};
pub use handler::{DeliveryHandler, HandlerError, StdoutHandler};
pub use publisher::{ExchangePublisher, Publisher};
pub use robust::RobustConsumer;
pub use session::{BrokerSession, SessionState};
pub use source::{DeliverySource, LapinAcker, LapinSource};

pub mod prelude {
    pub use crate::consumer::{ConsumeEnd, ConsumeReport, QueueConsumer};
    pub use crate::handler::{DeliveryHandler, HandlerError, StdoutHandler};
    pub use crate::publisher::{ExchangePublisher, Publisher};
    pub use crate::robust::RobustConsumer;
    pub use crate::source::DeliverySource;
}
