//! Broker deliveries and their acknowledgment discipline.
//!
//! # The Problem
//!
//! A delivery must be acknowledged exactly once, and only after the local
//! handler succeeded. Acking early loses the message if the handler then
//! fails; acking twice is a channel-level protocol error.
//!
//! # The Solution
//!
//! A [`Delivery`] owns the only handle able to acknowledge it:
//!
//! 1. It starts in [`AckState::Pending`].
//! 2. [`Delivery::ack`] consumes the delivery, so a second ack does not compile.
//! 3. Dropping a delivery without acking leaves it unacknowledged on the
//!    broker, which redelivers it once the channel closes.
//!
//! ```rust
//! use u2a_core::delivery::{Acker, Delivery};
//! use bytes::Bytes;
//!
//! struct Noop;
//!
//! #[async_trait::async_trait(?Send)]
//! impl Acker for Noop {
//!     async fn ack(&self, _delivery_tag: u64) -> u2a_core::error::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> u2a_core::error::Result<()> {
//! let delivery = Delivery::new(1, Bytes::from_static(b"hello"), false, Noop);
//! assert_eq!(delivery.body().as_ref(), b"hello");
//! delivery.ack().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::Result;

/// Acknowledgment state of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckState {
    /// Received, not yet acknowledged
    Pending,
    /// Acknowledged to the broker
    Acknowledged,
}

/// Something able to acknowledge a delivery by tag.
#[async_trait(?Send)]
pub trait Acker {
    /// Acknowledge a single delivery.
    async fn ack(&self, delivery_tag: u64) -> Result<()>;
}

/// A message handed over by the broker, owned by the step processing it.
pub struct Delivery<A: Acker> {
    delivery_tag: u64,
    body: Bytes,
    redelivered: bool,
    state: AckState,
    acker: A,
}

impl<A: Acker> Delivery<A> {
    /// Wrap a received message. The delivery starts pending.
    pub fn new(delivery_tag: u64, body: Bytes, redelivered: bool, acker: A) -> Self {
        Self {
            delivery_tag,
            body,
            redelivered,
            state: AckState::Pending,
            acker,
        }
    }

    /// Broker-assigned tag, unique per channel.
    #[inline]
    pub const fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    /// Opaque payload.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the broker flagged this as a redelivery.
    #[inline]
    pub const fn is_redelivered(&self) -> bool {
        self.redelivered
    }

    /// Current acknowledgment state.
    #[inline]
    pub const fn state(&self) -> AckState {
        self.state
    }

    /// Acknowledge and release the delivery.
    ///
    /// **Only call this once the handler has completed successfully.**
    /// On error the delivery stays unacknowledged.
    pub async fn ack(mut self) -> Result<AckState> {
        self.acker.ack(self.delivery_tag).await?;
        self.state = AckState::Acknowledged;
        trace!(delivery_tag = self.delivery_tag, "delivery acknowledged");
        Ok(self.state)
    }
}

impl<A: Acker> Drop for Delivery<A> {
    fn drop(&mut self) {
        if self.state == AckState::Pending {
            debug!(
                delivery_tag = self.delivery_tag,
                "delivery released unacknowledged, left for redelivery"
            );
        }
    }
}

impl<A: Acker> std::fmt::Debug for Delivery<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("delivery_tag", &self.delivery_tag)
            .field("len", &self.body.len())
            .field("redelivered", &self.redelivered)
            .field("state", &self.state)
            .finish()
    }
}
