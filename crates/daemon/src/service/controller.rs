//! Reconnect controller
//!
//! Owns the gadget attach/detach lifecycle. Once per poll tick it asks the
//! aggregator whether the share has been quiet long enough, and if so runs
//! the bounce sequence: detach, settle, flush, settle, reattach. Every
//! command is best-effort; a failed modprobe is logged and the sequence
//! continues, because the next cycle (or shutdown) retries the same commands.

use std::sync::Arc;
use std::time::Duration;

use common::aggregator::ChangeAggregator;
use common::command::CommandRunner;
use common::gadget::GadgetConfig;

/// Gadget lifecycle states.
///
/// `Bouncing` is transient: it is entered and left within a single `tick`.
/// `Detached` is both the initial state and, after `shutdown`, terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GadgetState {
    Detached,
    Attached,
    Bouncing,
}

pub struct ReconnectController {
    gadget: GadgetConfig,
    runner: Arc<dyn CommandRunner>,
    quiescence: Duration,
    settle_delay: Duration,
    state: GadgetState,
}

impl ReconnectController {
    pub fn new(
        gadget: GadgetConfig,
        runner: Arc<dyn CommandRunner>,
        quiescence: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            gadget,
            runner,
            quiescence,
            settle_delay,
            state: GadgetState::Detached,
        }
    }

    pub fn state(&self) -> GadgetState {
        self.state
    }

    /// Attach the gadget for the first time.
    ///
    /// Always detaches first: a crashed predecessor may have left the module
    /// loaded with a stale backing configuration.
    pub async fn start(&mut self) {
        self.run_logged(&self.gadget.unload_command()).await;
        self.run_logged(&self.gadget.load_command()).await;
        self.state = GadgetState::Attached;
        tracing::info!("gadget attached");
    }

    /// One control loop iteration: bounce if the share has settled.
    pub async fn tick(&mut self, aggregator: &mut ChangeAggregator) {
        if self.state != GadgetState::Attached {
            return;
        }
        if !aggregator.is_due(self.quiescence) {
            return;
        }

        tracing::info!(
            "share idle for {:?} after changes, reconnecting gadget",
            self.quiescence
        );
        self.state = GadgetState::Bouncing;
        self.bounce().await;
        self.state = GadgetState::Attached;
        aggregator.reset();
    }

    /// Detach and exit the lifecycle. Idempotent; `Detached` is terminal.
    pub async fn shutdown(&mut self) {
        if self.state == GadgetState::Detached {
            return;
        }
        self.run_logged(&self.gadget.unload_command()).await;
        self.state = GadgetState::Detached;
        tracing::info!("gadget detached");
    }

    /// The fixed bounce sequence. Runs every step even if individual
    /// commands fail.
    async fn bounce(&self) {
        self.run_logged(&self.gadget.unload_command()).await;
        tokio::time::sleep(self.settle_delay).await;
        self.run_logged(&self.gadget.flush_command()).await;
        tokio::time::sleep(self.settle_delay).await;
        self.run_logged(&self.gadget.load_command()).await;
    }

    /// Run one command, absorbing every failure into a log line.
    async fn run_logged(&self, command: &str) {
        match self.runner.run(command).await {
            Ok(output) if output.success() => {
                tracing::debug!("ran: {command}");
            }
            Ok(output) => {
                tracing::warn!(
                    "command failed (exit {}): {command}\n{}",
                    output.status,
                    output.stderr.trim_end()
                );
            }
            Err(error) => {
                tracing::error!("command did not run: {command}: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::command::{CommandError, CommandOutput};
    use common::event::{ChangeEvent, ChangeKind};
    use std::sync::Mutex;

    /// Records every command line; optionally fails them all.
    struct RecordingRunner {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingRunner {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail,
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
            self.calls.lock().unwrap().push(command.to_string());
            Ok(CommandOutput {
                status: if self.fail { 1 } else { 0 },
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    fn controller(runner: Arc<RecordingRunner>) -> ReconnectController {
        ReconnectController::new(
            GadgetConfig::new("/img.bin"),
            runner,
            Duration::from_secs(5),
            Duration::from_secs(1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_detaches_before_attaching() {
        let runner = RecordingRunner::new(false);
        let mut controller = controller(runner.clone());

        controller.start().await;

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("modprobe -r"));
        assert!(calls[1].starts_with("modprobe g_multi"));
        assert_eq!(controller.state(), GadgetState::Attached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_bounces_after_quiescence() {
        let runner = RecordingRunner::new(false);
        let mut controller = controller(runner.clone());
        let mut aggregator = ChangeAggregator::new();

        controller.start().await;
        aggregator.record(&ChangeEvent::new("a.txt", ChangeKind::Modified));

        tokio::time::advance(Duration::from_secs(4)).await;
        controller.tick(&mut aggregator).await;
        assert_eq!(runner.calls().len(), 2, "no bounce before the window closes");

        tokio::time::advance(Duration::from_secs(1)).await;
        controller.tick(&mut aggregator).await;

        let calls = runner.calls();
        assert_eq!(
            calls[2..],
            [
                "modprobe -r g_multi".to_string(),
                "sync".to_string(),
                GadgetConfig::new("/img.bin").load_command(),
            ]
        );
        assert!(!aggregator.dirty(), "bounce resets the aggregator");
        assert_eq!(controller.state(), GadgetState::Attached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounce_runs_every_step_when_commands_fail() {
        let runner = RecordingRunner::new(true);
        let mut controller = controller(runner.clone());
        let mut aggregator = ChangeAggregator::new();

        controller.start().await;
        aggregator.record(&ChangeEvent::new("a.txt", ChangeKind::Deleted));
        tokio::time::advance(Duration::from_secs(5)).await;
        controller.tick(&mut aggregator).await;

        // 2 startup commands + detach, flush, attach despite every failure.
        assert_eq!(runner.calls().len(), 5);
        assert_eq!(controller.state(), GadgetState::Attached);
        assert!(!aggregator.dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_without_changes_is_a_noop() {
        let runner = RecordingRunner::new(false);
        let mut controller = controller(runner.clone());
        let mut aggregator = ChangeAggregator::new();

        controller.start().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        controller.tick(&mut aggregator).await;

        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_is_terminal() {
        let runner = RecordingRunner::new(false);
        let mut controller = controller(runner.clone());
        let mut aggregator = ChangeAggregator::new();

        controller.start().await;
        controller.shutdown().await;
        assert_eq!(controller.state(), GadgetState::Detached);
        let calls_after_shutdown = runner.calls().len();

        // Dirty + overdue, but shutdown already happened: no bounce.
        aggregator.record(&ChangeEvent::new("a.txt", ChangeKind::Modified));
        tokio::time::advance(Duration::from_secs(60)).await;
        controller.tick(&mut aggregator).await;
        controller.shutdown().await;

        assert_eq!(runner.calls().len(), calls_after_shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_runs_single_detach() {
        let runner = RecordingRunner::new(false);
        let mut controller = controller(runner.clone());

        controller.start().await;
        controller.shutdown().await;

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[2].starts_with("modprobe -r"));
    }
}
