//! Rate-limited event producer.
//!
//! Sends indexed, timestamped [`Event`]s to one target, one datagram per
//! event, sleeping a fixed interval after every send:
//!
//! ```text
//! for index in 0..N (or 0.. when N == 0):
//!     encode Event { event_time: now, index }
//!     send one datagram          (failure is fatal, never retried)
//!     sleep wait_interval        (interruptible by shutdown)
//! ```
//!
//! Pacing is not adaptive: send latency is not subtracted from the sleep.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::pin;

use async_trait::async_trait;
use compio::buf::BufResult;
use compio::net::UdpSocket;
use futures::future::{select, Either};
use tracing::{debug, info};
use u2a_core::endpoint::Endpoint;
use u2a_core::error::Result;
use u2a_core::event::Event;
use u2a_core::options::ProducerOptions;
use u2a_core::shutdown::Shutdown;

/// Fire-and-forget datagram destination.
#[async_trait(?Send)]
pub trait DatagramSink {
    /// Send one payload as one datagram.
    async fn send(&mut self, payload: &[u8]) -> Result<()>;
}

/// UDP socket aimed at a single resolved peer.
///
/// The socket is bound to the unspecified address of the peer's family and
/// lives as long as the target; dropping the target closes it.
#[derive(Debug)]
pub struct UdpTarget {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTarget {
    /// Resolve `endpoint` and open the sending socket.
    pub async fn open(endpoint: &Endpoint) -> Result<Self> {
        let peer = endpoint.resolve()?;
        let local = match peer {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(local).await?;
        debug!(%peer, "UDP socket open");
        Ok(Self { socket, peer })
    }

    /// Resolved destination.
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address the OS picked for the socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait(?Send)]
impl DatagramSink for UdpTarget {
    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        let BufResult(sent, _) = self.socket.send_to(payload.to_vec(), self.peer).await;
        sent?;
        Ok(())
    }
}

/// Outcome of a producer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    /// Datagrams handed to the sink.
    pub sent: u64,
}

/// Paced event emitter over a [`DatagramSink`].
#[derive(Debug)]
pub struct EventProducer<S> {
    sink: S,
    options: ProducerOptions,
    target: String,
}

impl EventProducer<UdpTarget> {
    /// Producer sending to `endpoint` over UDP.
    pub async fn udp(endpoint: &Endpoint, options: ProducerOptions) -> Result<Self> {
        let sink = UdpTarget::open(endpoint).await?;
        Ok(Self::new(sink, endpoint.to_string(), options))
    }
}

impl<S: DatagramSink> EventProducer<S> {
    /// Producer over an arbitrary sink. `target` is only used for logging.
    pub fn new(sink: S, target: impl Into<String>, options: ProducerOptions) -> Self {
        Self {
            sink,
            options,
            target: target.into(),
        }
    }

    /// Recover the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Send events until the configured count is reached or shutdown is
    /// requested.
    ///
    /// Shutdown is observed before each send and during each sleep, never
    /// in the middle of a send. Interruption is a normal end: the report
    /// counts what was sent so far.
    pub async fn run(&mut self, shutdown: &Shutdown) -> Result<ProducerReport> {
        let mut report = ProducerReport::default();
        info!("sending data to {}", self.target);

        let count = self.options.message_count;
        for index in (0_u64..).take_while(|&index| count == 0 || index < count) {
            if shutdown.is_triggered() {
                break;
            }

            let payload = Event::now(index).encode()?;
            debug!("sending data: {}", String::from_utf8_lossy(&payload));
            self.sink.send(&payload).await?;
            report.sent += 1;

            let sleep = pin!(compio::time::sleep(self.options.wait_interval));
            let stop = pin!(shutdown.wait());
            if let Either::Right(_) = select(sleep, stop).await {
                break;
            }
        }

        debug!(sent = report.sent, "producer stopped");
        Ok(report)
    }
}
