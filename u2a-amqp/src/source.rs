//! Trait-based delivery source for the consumption loop.
//!
//! The loop only needs "await the next delivery" and "acknowledge it". This
//! seam keeps the loop independent of the broker client, which makes it
//! testable with scripted sources.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use lapin::options::BasicAckOptions;
use u2a_core::delivery::{Acker, Delivery};
use u2a_core::error::{Result, U2aError};

/// Ordered stream of deliveries for a single consumer.
///
/// # Examples
///
/// ```no_run
/// use u2a_amqp::source::DeliverySource;
///
/// async fn drain<S: DeliverySource>(source: &mut S) -> u2a_core::error::Result<usize> {
///     let mut count = 0;
///     while let Some(delivery) = source.next_delivery().await {
///         delivery?.ack().await?;
///         count += 1;
///     }
///     Ok(count)
/// }
/// ```
#[async_trait(?Send)]
pub trait DeliverySource {
    /// Acknowledgment handle carried by each delivery.
    type Acker: Acker;

    /// Wait for the next delivery.
    ///
    /// # Returns
    ///
    /// - `Some(Ok(delivery))` - Next delivery, in broker order
    /// - `Some(Err(e))` - The stream failed
    /// - `None` - The stream ended (consumer cancelled or connection closed)
    async fn next_delivery(&mut self) -> Option<Result<Delivery<Self::Acker>>>;
}

/// Acknowledges through the per-delivery `lapin` acker.
#[derive(Debug)]
pub struct LapinAcker(lapin::acker::Acker);

#[async_trait(?Send)]
impl Acker for LapinAcker {
    async fn ack(&self, delivery_tag: u64) -> Result<()> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| U2aError::broker(format!("ack of delivery {delivery_tag} failed: {e}")))
    }
}

/// Deliveries from a `lapin` consumer.
#[derive(Debug)]
pub struct LapinSource {
    consumer: lapin::Consumer,
}

impl LapinSource {
    pub(crate) fn new(consumer: lapin::Consumer) -> Self {
        Self { consumer }
    }

    /// Server-assigned consumer tag.
    pub fn consumer_tag(&self) -> String {
        self.consumer.tag().as_str().to_string()
    }
}

#[async_trait(?Send)]
impl DeliverySource for LapinSource {
    type Acker = LapinAcker;

    async fn next_delivery(&mut self) -> Option<Result<Delivery<LapinAcker>>> {
        let next = self.consumer.next().await?;
        Some(
            next.map(|delivery| {
                Delivery::new(
                    delivery.delivery_tag,
                    Bytes::from(delivery.data),
                    delivery.redelivered,
                    LapinAcker(delivery.acker),
                )
            })
            .map_err(|e| U2aError::broker(format!("delivery stream failed: {e}"))),
        )
    }
}
