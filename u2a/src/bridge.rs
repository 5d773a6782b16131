//! UDP-to-AMQP bridge.
//!
//! Every datagram received on the bound socket is published verbatim as one
//! message to the configured exchange and routing key. Any failure tears the
//! whole run down (socket and broker connection) and, unless retries are
//! disabled, starts over after `min(limit, 100ms * 2^retries)`.

use std::pin::pin;

use compio::buf::BufResult;
use compio::net::UdpSocket;
use futures::future::{select, Either};
use tracing::{debug, error, info};
use u2a_amqp::publisher::{ExchangePublisher, Publisher};
use u2a_core::error::Result;
use u2a_core::options::BridgeOptions;
use u2a_core::reconnect::ReconnectState;
use u2a_core::shutdown::Shutdown;

/// Outcome of a bridge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeReport {
    /// Datagrams published, across all connections.
    pub forwarded: u64,
    /// Times the run was restarted after a failure.
    pub restarts: u32,
}

/// Forward datagrams from `socket` to `publisher` until shutdown or the
/// first failure, counting each publish in `forwarded`.
///
/// Payloads longer than `buffer_size` are truncated by the OS.
pub async fn forward<P>(
    socket: &UdpSocket,
    publisher: &P,
    buffer_size: usize,
    shutdown: &Shutdown,
    forwarded: &mut u64,
) -> Result<()>
where
    P: Publisher + ?Sized,
{
    let mut buf = Vec::with_capacity(buffer_size);

    loop {
        buf.clear();
        let received = {
            let recv = pin!(socket.recv_from(buf));
            let stop = pin!(shutdown.wait());
            match select(recv, stop).await {
                Either::Left((received, _)) => received,
                Either::Right(_) => return Ok(()),
            }
        };

        let BufResult(result, returned) = received;
        buf = returned;
        let (len, from) = result?;
        debug!("received {len} bytes from `{from}`");

        publisher.publish(&buf[..len]).await?;
        *forwarded += 1;
    }
}

/// Long-running UDP-to-AMQP forwarder with retry.
#[derive(Debug)]
pub struct Bridge {
    options: BridgeOptions,
    report: BridgeReport,
}

impl Bridge {
    /// Bridge for the given socket, broker and exchange settings.
    pub fn new(options: BridgeOptions) -> Self {
        Self {
            options,
            report: BridgeReport::default(),
        }
    }

    /// Counters so far.
    pub const fn report(&self) -> BridgeReport {
        self.report
    }

    /// Run until shutdown. With `no_reconnect`, the first failure is
    /// returned.
    pub async fn run(&mut self, shutdown: &Shutdown) -> Result<BridgeReport> {
        let mut reconnect = ReconnectState::for_bridge(&self.options);

        loop {
            if shutdown.is_triggered() {
                return Ok(self.report);
            }
            match self.run_once(&mut reconnect, shutdown).await {
                Ok(()) => return Ok(self.report),
                Err(e) if self.options.no_reconnect => return Err(e),
                Err(e) => error!("retrying after error: {e}"),
            }

            // The bridge policy has no attempt limit.
            let Some(delay) = reconnect.next_delay() else {
                return Ok(self.report);
            };
            self.report.restarts += 1;

            let sleep = pin!(compio::time::sleep(delay));
            let stop = pin!(shutdown.wait());
            if let Either::Right(_) = select(sleep, stop).await {
                return Ok(self.report);
            }
        }
    }

    /// One full run: bind, connect, forward, release. Shutdown is observed
    /// while connecting and while forwarding.
    async fn run_once(
        &mut self,
        reconnect: &mut ReconnectState,
        shutdown: &Shutdown,
    ) -> Result<()> {
        let socket = UdpSocket::bind(self.options.udp_bind_addr.as_str()).await?;
        info!("bound to udp socket `{}`", self.options.udp_bind_addr);

        let publisher = {
            let connect = pin!(ExchangePublisher::connect(&self.options));
            let stop = pin!(shutdown.wait());
            match select(connect, stop).await {
                Either::Left((publisher, _)) => publisher?,
                Either::Right(_) => {
                    debug!("shutdown requested while connecting");
                    return Ok(());
                }
            }
        };
        reconnect.reset();

        let result = forward(
            &socket,
            &publisher,
            self.options.recv_buffer_size,
            shutdown,
            &mut self.report.forwarded,
        )
        .await;
        publisher.close().await;
        result
    }
}
