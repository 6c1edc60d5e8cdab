pub mod aggregator;
pub mod command;
pub mod event;
pub mod gadget;
pub mod version;

pub use aggregator::ChangeAggregator;
pub use command::{CommandError, CommandOutput, CommandRunner, ShellRunner};
pub use event::{ChangeEvent, ChangeKind};
pub use gadget::GadgetConfig;

/// Build info for this crate (version + build timestamp).
pub fn build_info() -> version::BuildInfo {
    version::BuildInfo::new()
}
