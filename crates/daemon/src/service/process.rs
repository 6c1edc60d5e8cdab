//! Service process: wiring and the control loop
//!
//! Builds the watcher, aggregator and controller from a [`Config`] and runs
//! the select loop until a termination signal arrives. Watcher events are
//! recorded as they arrive; the controller is ticked at the poll cadence;
//! shutdown detaches the gadget exactly once before returning.

use std::sync::Arc;

use common::aggregator::ChangeAggregator;
use common::command::ShellRunner;

use super::controller::ReconnectController;
use super::watcher::{ShareWatcher, WatchError};
use super::Config;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("watcher stopped delivering events")]
    WatcherClosed,
}

/// Run the service until SIGINT/SIGTERM. Blocks the calling task.
pub async fn start_service(config: &Config) -> Result<(), ServiceError> {
    let runner = Arc::new(ShellRunner::new(config.command_timeout));
    let mut aggregator = ChangeAggregator::new();
    let mut controller = ReconnectController::new(
        config.gadget.clone(),
        runner,
        config.quiescence,
        config.settle_delay,
    );

    let (watcher, events) = ShareWatcher::spawn(&config.watch_path)?;

    controller.start().await;

    let mut poll = tokio::time::interval(config.poll_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            event = events.recv_async() => match event {
                Ok(event) => {
                    if aggregator.record(&event) {
                        tracing::info!("change detected: {}", event.path.display());
                    }
                }
                // The watcher owns the sender; a closed channel means it died.
                Err(_) => break Err(ServiceError::WatcherClosed),
            },
            _ = poll.tick() => {
                controller.tick(&mut aggregator).await;
            }
            _ = &mut shutdown => {
                tracing::info!("termination signal received");
                break Ok(());
            }
        }
    };

    watcher.stop();
    controller.shutdown().await;
    tracing::info!("usb mass storage detached, exiting");

    result
}

/// Completes on SIGINT (ctrl-c) or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
