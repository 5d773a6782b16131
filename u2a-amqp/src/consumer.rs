//! Acknowledging consumption loop.
//!
//! # Discipline
//!
//! - One delivery in flight: the handler runs to completion before the next
//!   delivery is awaited, so deliveries are processed in broker order.
//! - A delivery is acknowledged only after its handler succeeded, exactly
//!   once ([`Delivery::ack`] consumes it).
//! - A rejected delivery is left unacknowledged and consumption continues.
//! - Output failures and broker failures end the loop.
//!
//! The only suspension points are "await next delivery" and "await ack".
//! Shutdown is observed at the first one, never between handling and ack.
//!
//! [`Delivery::ack`]: u2a_core::delivery::Delivery::ack

use std::pin::pin;

use futures::future::{select, Either};
use tracing::{debug, error, trace, warn};
use u2a_core::error::Result;
use u2a_core::shutdown::Shutdown;

use crate::handler::{DeliveryHandler, HandlerError};
use crate::source::DeliverySource;

/// Counters accumulated across one or more consumption runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeReport {
    /// Deliveries accepted from the source.
    pub delivered: u64,
    /// Deliveries acknowledged after successful handling.
    pub acknowledged: u64,
    /// Deliveries refused by the handler and left unacknowledged.
    pub rejected: u64,
}

/// Why a consumption run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeEnd {
    /// The source ran dry: consumer cancelled or connection closed.
    StreamClosed,
    /// Shutdown was requested while waiting for a delivery.
    ShutdownRequested,
}

/// Drives a [`DeliveryHandler`] over a [`DeliverySource`].
#[derive(Debug)]
pub struct QueueConsumer<H> {
    handler: H,
    report: ConsumeReport,
}

impl<H: DeliveryHandler> QueueConsumer<H> {
    /// Create a consumer around a handler.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            report: ConsumeReport::default(),
        }
    }

    /// Counters so far.
    pub const fn report(&self) -> ConsumeReport {
        self.report
    }

    /// Recover the handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Consume until the source ends, shutdown is requested, or a fatal
    /// error occurs.
    pub async fn run<S>(&mut self, source: &mut S, shutdown: &Shutdown) -> Result<ConsumeEnd>
    where
        S: DeliverySource,
    {
        loop {
            let next = {
                let recv = pin!(source.next_delivery());
                let stop = pin!(shutdown.wait());
                match select(recv, stop).await {
                    Either::Left((next, _)) => next,
                    Either::Right(_) => {
                        debug!("shutdown requested, leaving consumption loop");
                        return Ok(ConsumeEnd::ShutdownRequested);
                    }
                }
            };

            let Some(next) = next else {
                debug!("delivery stream ended");
                return Ok(ConsumeEnd::StreamClosed);
            };
            let delivery = next?;
            self.report.delivered += 1;

            let delivery_tag = delivery.delivery_tag();
            trace!(
                delivery_tag,
                len = delivery.body().len(),
                redelivered = delivery.is_redelivered(),
                "processing delivery"
            );

            match self.handler.handle(delivery.body()) {
                Ok(()) => {
                    delivery.ack().await?;
                    self.report.acknowledged += 1;
                }
                Err(HandlerError::Rejected(reason)) => {
                    self.report.rejected += 1;
                    warn!(delivery_tag, "{reason}, delivery left unacknowledged");
                    drop(delivery);
                }
                Err(e @ HandlerError::Io(_)) => {
                    error!(delivery_tag, "{e}");
                    return Err(e.into());
                }
            }
        }
    }
}
