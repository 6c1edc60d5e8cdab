// Service modules (daemon functionality)
pub mod service;

// App state (configuration, paths)
pub mod state;

// Re-exports for consumers
pub use service::{start_service, Config as ServiceConfig, ServiceError};
pub use state::{AppConfig, AppState, StateError};

/// Build info for the daemon binary.
pub fn build_info() -> common::version::BuildInfo {
    common::build_info()
}
