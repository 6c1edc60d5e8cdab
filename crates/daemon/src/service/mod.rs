//! The running service: watcher, aggregator, reconnect controller.

pub mod controller;
pub mod process;
pub mod watcher;

use std::path::PathBuf;
use std::time::Duration;

use common::gadget::GadgetConfig;

pub use controller::{GadgetState, ReconnectController};
pub use process::{start_service, ServiceError};
pub use watcher::{ShareWatcher, WatchError};

/// Service configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory whose direct children are watched for changes.
    pub watch_path: PathBuf,
    /// Gadget parameters for the attach command.
    pub gadget: GadgetConfig,
    /// Control loop cadence.
    pub poll_interval: Duration,
    /// Idle time after the last qualifying change before a reconnect.
    pub quiescence: Duration,
    /// Pause between bounce sequence steps.
    pub settle_delay: Duration,
    /// Upper bound on a single external command.
    pub command_timeout: Duration,
}
