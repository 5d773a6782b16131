//! u2a Core
//!
//! This crate contains the transport-agnostic building blocks:
//! - Target address parsing (`endpoint`)
//! - Wire events produced over UDP (`event`)
//! - Delivery ownership and acknowledgment (`delivery`)
//! - Producer / consumer / bridge options (`options`)
//! - Reconnection backoff (`reconnect`)
//! - Session lifecycle monitoring (`monitor`)
//! - Cooperative shutdown (`shutdown`)
//! - Diagnostic output (`logging`)
//! - Error types (`error`)

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
pub mod delivery;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod logging;
pub mod monitor;
pub mod options;
pub mod reconnect;
pub mod shutdown;

pub mod prelude {
    pub use crate::delivery::{AckState, Acker, Delivery};
    pub use crate::endpoint::{Endpoint, EndpointError};
    pub use crate::error::{Result, U2aError};
    pub use crate::event::Event;
    pub use crate::logging::LogConfig;
    pub use crate::monitor::{SessionEvent, SessionMonitor};
    pub use crate::options::{BridgeOptions, ConsumerOptions, ProducerOptions};
    pub use crate::reconnect::ReconnectState;
    pub use crate::shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
}
