//! Send paced, indexed JSON events to a UDP target.
//!
//! ```text
//! udp_producer udp://127.0.0.1:9000 -n 100 -w 50 -d
//! ```

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error};
use u2a::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "udp_producer", version, about = "Send timestamped JSON events over UDP")]
struct Args {
    /// Address to send to, in format udp://{host}:{port}
    url: String,

    /// Number of messages to produce (0 is unlimited)
    #[arg(short = 'n', long = "message-number", default_value_t = 0)]
    message_number: u64,

    /// Pause after every send, in milliseconds
    #[arg(short = 'w', long = "wait-interval", default_value_t = 10)]
    wait_interval: u64,

    /// Log at DEBUG level, including every payload
    #[arg(short, long)]
    debug: bool,

    /// Log filter directives, overriding --debug
    #[arg(long, env = "RUST_LOG", hide_env_values = true)]
    log_filter: Option<String>,
}

#[compio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log = LogConfig::new(args.debug).with_filter(args.log_filter.clone());
    let shutdown = u2a::init_process(&log);

    match run(args, &shutdown).await {
        Ok(report) => {
            debug!(sent = report.sent, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, shutdown: &Shutdown) -> Result<ProducerReport> {
    // Parsed before any socket is opened.
    let endpoint = Endpoint::parse(&args.url)?;
    let options = ProducerOptions::default()
        .with_message_count(args.message_number)
        .with_wait_interval(Duration::from_millis(args.wait_interval));

    let mut producer = EventProducer::udp(&endpoint, options).await?;
    producer.run(shutdown).await
}
