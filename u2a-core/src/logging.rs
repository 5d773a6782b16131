//! Diagnostic output configuration.
//!
//! All diagnostics go to standard error as `[LEVEL] : message`. Standard
//! output is reserved for business output (delivered bodies).
//!
//! Binaries build a [`LogConfig`] from their flags and install it once for
//! the whole process with [`LogConfig::install`], so events from threads the
//! runtime does not own (the broker client's I/O threads) are formatted too.
//! Components never read logging state; they only emit events.

use std::fmt;
use std::io;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Logging configuration passed into each entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// Raise verbosity from INFO to DEBUG.
    pub debug: bool,
    /// `RUST_LOG`-style directives; override `debug` when valid.
    pub filter: Option<String>,
}

impl LogConfig {
    /// Configuration for a `-d/--debug` flag.
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            filter: None,
        }
    }

    /// Attach explicit filter directives.
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|directives| !directives.trim().is_empty());
        self
    }

    /// Maximum level when no filter directives are given.
    pub const fn level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// Build the event filter.
    ///
    /// Invalid directives fall back to the flag-derived level.
    pub fn env_filter(&self) -> EnvFilter {
        self.filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level().as_str()))
    }

    /// Subscriber writing `[LEVEL] : message` lines to standard error.
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        self.subscriber_with_writer(io::stderr)
    }

    /// Same subscriber with a custom writer.
    pub fn subscriber_with_writer<W>(&self, make_writer: W) -> impl Subscriber + Send + Sync + 'static
    where
        W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
    {
        tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_writer(make_writer)
            .event_format(LevelPrefixFormat)
            .finish()
    }

    /// Install the subscriber for every thread of the process.
    ///
    /// Only the first install takes effect: returns `false`, keeping the
    /// existing subscriber, when one is already set.
    pub fn install(&self) -> bool {
        self.install_with_writer(io::stderr)
    }

    fn install_with_writer<W>(&self, make_writer: W) -> bool
    where
        W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
    {
        tracing::subscriber::set_global_default(self.subscriber_with_writer(make_writer)).is_ok()
    }
}

/// Event formatter producing `[LEVEL] : message key=value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelPrefixFormat;

impl<S, N> FormatEvent<S, N> for LevelPrefixFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "[{}] : ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
