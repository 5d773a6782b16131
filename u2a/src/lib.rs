//! # u2a
//!
//! Small network utilities for exercising a UDP → AMQP messaging pipeline.
//!
//! ## Architecture
//!
//! - **`u2a-core`**: Target addresses, the wire `Event`, options, backoff,
//!   delivery acknowledgment guard, logging, shutdown
//! - **`u2a-amqp`**: Broker session, acknowledging consumer, publisher
//! - **`u2a`**: Event producer, UDP → AMQP bridge and the binaries (this crate)
//!
//! ## Binaries
//!
//! - **`udp_producer`** - Paced, indexed JSON events to a UDP target
//! - **`amqp_consumer`** - Binds an anonymous queue and prints each delivery
//! - **`udp2amqp`** - Publishes every received datagram to an exchange
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use u2a::prelude::*;
//!
//! #[compio::main]
//! async fn main() -> u2a::Result<()> {
//!     let endpoint = Endpoint::parse("udp://127.0.0.1:9000")?;
//!     let options = ProducerOptions::default().with_message_count(100);
//!
//!     let mut producer = EventProducer::udp(&endpoint, options).await?;
//!     let report = producer.run(&Shutdown::never()).await?;
//!     assert_eq!(report.sent, 100);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod producer;

pub use u2a_core::error::{Result, U2aError};

/// Everything the binaries need.
pub mod prelude {
    pub use crate::bridge::{forward, Bridge, BridgeReport};
    pub use crate::producer::{DatagramSink, EventProducer, ProducerReport, UdpTarget};
    pub use u2a_amqp::prelude::*;
    pub use u2a_core::prelude::*;
}

/// Install the log subscriber and a `ctrl_c` watcher for a binary.
///
/// The subscriber covers the whole process; the returned signal fires on
/// the first `ctrl_c`. Must be called from inside the runtime.
pub fn init_process(log: &u2a_core::logging::LogConfig) -> u2a_core::shutdown::Shutdown {
    if !log.install() {
        tracing::debug!("log subscriber already installed");
    }
    let (trigger, shutdown) = u2a_core::shutdown::shutdown_channel();

    compio::runtime::spawn(async move {
        match compio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupted");
                trigger.fire();
            }
            Err(e) => {
                tracing::warn!("unable to listen for ctrl_c: {e}");
                // Holding the trigger keeps the signal unfired.
                let _trigger = trigger;
                futures::future::pending::<()>().await;
            }
        }
    })
    .detach();

    shutdown
}
