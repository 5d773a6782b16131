//! Local processing of delivered payloads.
//!
//! A handler runs synchronously, to completion, before the next delivery is
//! fetched. Its outcome decides whether the delivery is acknowledged.

use std::io::{self, Write};

use thiserror::Error;
use u2a_core::error::U2aError;

/// Why a handler did not complete.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload was refused. The delivery stays unacknowledged and
    /// consumption continues.
    #[error("delivery rejected: {0}")]
    Rejected(String),

    /// Writing output failed. Fatal for the consumption loop.
    #[error("output failed: {0}")]
    Io(#[from] io::Error),
}

impl From<HandlerError> for U2aError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Rejected(reason) => Self::Handler(reason),
            HandlerError::Io(e) => Self::Output(e),
        }
    }
}

/// Processes one payload.
pub trait DeliveryHandler {
    /// Handle a delivery body. `Ok` means the delivery may be acknowledged.
    fn handle(&mut self, body: &[u8]) -> Result<(), HandlerError>;
}

impl<F> DeliveryHandler for F
where
    F: FnMut(&[u8]) -> Result<(), HandlerError>,
{
    fn handle(&mut self, body: &[u8]) -> Result<(), HandlerError> {
        self(body)
    }
}

/// Prints each body as one ASCII line.
///
/// Non-ASCII bodies are rejected rather than printed lossily.
#[derive(Debug)]
pub struct StdoutHandler<W = io::Stdout> {
    out: W,
}

impl StdoutHandler<io::Stdout> {
    /// Handler writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> StdoutHandler<W> {
    /// Handler writing to an arbitrary sink.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DeliveryHandler for StdoutHandler<W> {
    fn handle(&mut self, body: &[u8]) -> Result<(), HandlerError> {
        if let Some(pos) = body.iter().position(|b| !b.is_ascii()) {
            return Err(HandlerError::Rejected(format!(
                "body is not ASCII (byte {pos} of {})",
                body.len()
            )));
        }

        // Flushed per line: the body must be out before the ack is sent.
        self.out.write_all(body)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}
