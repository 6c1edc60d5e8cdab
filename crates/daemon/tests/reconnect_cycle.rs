//! End-to-end reconnect scheduling scenarios
//!
//! These drive the controller and aggregator through the public library API
//! with a scripted command runner and the paused tokio clock, so the timing
//! windows are exact.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use common::aggregator::ChangeAggregator;
use common::command::{CommandError, CommandOutput, CommandRunner};
use common::event::{ChangeEvent, ChangeKind};
use common::gadget::GadgetConfig;
use usbshare_daemon::service::{GadgetState, ReconnectController};

struct ScriptedRunner {
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(command.to_string());
        Ok(CommandOutput {
            status: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

fn setup(runner: Arc<ScriptedRunner>) -> (ReconnectController, ChangeAggregator) {
    let controller = ReconnectController::new(
        GadgetConfig::new("/piusb.bin"),
        runner,
        Duration::from_secs(5),
        Duration::from_secs(1),
    );
    (controller, ChangeAggregator::new())
}

#[tokio::test(start_paused = true)]
async fn test_single_edit_reconnects_after_five_seconds() {
    let runner = ScriptedRunner::new();
    let (mut controller, mut aggregator) = setup(runner.clone());
    controller.start().await;

    aggregator.record(&ChangeEvent::new("/mnt/usb_share/doc.txt", ChangeKind::Modified));

    // Tick once per second like the real loop.
    for _ in 0..4 {
        tokio::time::advance(Duration::from_secs(1)).await;
        controller.tick(&mut aggregator).await;
    }
    assert_eq!(runner.calls().len(), 2, "still within the quiescence window");

    tokio::time::advance(Duration::from_secs(1)).await;
    controller.tick(&mut aggregator).await;
    assert_eq!(runner.calls().len(), 5, "bounce ran detach + flush + attach");
    assert!(!aggregator.dirty());

    // Nothing further without new changes.
    for _ in 0..10 {
        tokio::time::advance(Duration::from_secs(1)).await;
        controller.tick(&mut aggregator).await;
    }
    assert_eq!(runner.calls().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_coalesces_into_one_bounce() {
    let runner = ScriptedRunner::new();
    let (mut controller, mut aggregator) = setup(runner.clone());
    controller.start().await;

    // Edits at t=0 and t=3 push the deadline to t=8.
    aggregator.record(&ChangeEvent::new("/mnt/usb_share/a.txt", ChangeKind::Modified));
    tokio::time::advance(Duration::from_secs(3)).await;
    aggregator.record(&ChangeEvent::new("/mnt/usb_share/b.txt", ChangeKind::Modified));

    tokio::time::advance(Duration::from_secs(4)).await;
    controller.tick(&mut aggregator).await;
    assert_eq!(runner.calls().len(), 2, "t=7 is before the pushed deadline");

    tokio::time::advance(Duration::from_secs(1)).await;
    controller.tick(&mut aggregator).await;
    assert_eq!(runner.calls().len(), 5, "one bounce for the whole burst");
}

#[tokio::test(start_paused = true)]
async fn test_creation_only_never_reconnects() {
    let runner = ScriptedRunner::new();
    let (mut controller, mut aggregator) = setup(runner.clone());
    controller.start().await;

    aggregator.record(&ChangeEvent::new("/mnt/usb_share/new.txt", ChangeKind::Created));

    for _ in 0..30 {
        tokio::time::advance(Duration::from_secs(1)).await;
        controller.tick(&mut aggregator).await;
    }
    assert_eq!(runner.calls().len(), 2, "no bounce for pure creations");
}

#[tokio::test(start_paused = true)]
async fn test_full_lifecycle_command_order() {
    let runner = ScriptedRunner::new();
    let (mut controller, mut aggregator) = setup(runner.clone());

    controller.start().await;
    aggregator.record(&ChangeEvent::new("/mnt/usb_share/a.txt", ChangeKind::Deleted));
    tokio::time::advance(Duration::from_secs(5)).await;
    controller.tick(&mut aggregator).await;
    controller.shutdown().await;
    assert_eq!(controller.state(), GadgetState::Detached);

    let gadget = GadgetConfig::new("/piusb.bin");
    assert_eq!(
        runner.calls(),
        vec![
            // start: clear stale session, then attach
            gadget.unload_command(),
            gadget.load_command(),
            // bounce
            gadget.unload_command(),
            gadget.flush_command(),
            gadget.load_command(),
            // shutdown
            gadget.unload_command(),
        ]
    );
}
