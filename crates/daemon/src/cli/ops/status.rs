use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use common::gadget::MODULE_NAME;
use usbshare_daemon::state::AppState;

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Status;

#[derive(Debug)]
pub struct ConfigInfo {
    pub directory: PathBuf,
    pub watch_path: PathBuf,
    pub image_path: PathBuf,
    pub quiescence_secs: u64,
}

#[derive(Debug)]
pub struct StatusOutput {
    pub config: Option<ConfigInfo>,
    pub config_error: Option<String>,
    /// None when the module listing is unavailable (non-Linux host).
    pub module_loaded: Option<bool>,
}

impl fmt::Display for StatusOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", "Config".bold())?;
        match &self.config {
            Some(info) => {
                writeln!(
                    f,
                    "  {} {}",
                    "directory:".dimmed(),
                    info.directory.display()
                )?;
                writeln!(
                    f,
                    "  {} {}",
                    "watching:".dimmed(),
                    info.watch_path.display()
                )?;
                writeln!(f, "  {} {}", "image:".dimmed(), info.image_path.display())?;
                writeln!(
                    f,
                    "  {} {}s",
                    "quiescence:".dimmed(),
                    info.quiescence_secs
                )?;
            }
            None => {
                if let Some(error) = &self.config_error {
                    writeln!(f, "  {} {}", "error:".red(), error)?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "{}:", "Gadget".bold())?;
        let module_str = match self.module_loaded {
            Some(true) => format!("{} ({MODULE_NAME} loaded)", "ATTACHED".green()),
            Some(false) => format!("{} ({MODULE_NAME} not loaded)", "DETACHED".red()),
            None => "UNKNOWN (no module listing)".dimmed().to_string(),
        };
        write!(f, "  {} {}", "module:".dimmed(), module_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("status failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl Op for Status {
    type Error = StatusError;
    type Output = StatusOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (config, config_error) = match AppState::load(ctx.config_path.clone()) {
            Ok(state) => (
                Some(ConfigInfo {
                    directory: state.usbshare_dir,
                    watch_path: state.config.watch_path,
                    image_path: state.config.image_path,
                    quiescence_secs: state.config.quiescence_secs,
                }),
                None,
            ),
            Err(error) => (None, Some(error.to_string())),
        };

        let module_loaded = std::fs::read_to_string("/proc/modules")
            .ok()
            .map(|listing| module_loaded(&listing, MODULE_NAME));

        Ok(StatusOutput {
            config,
            config_error,
            module_loaded,
        })
    }
}

/// Whether `module` appears in a `/proc/modules` style listing.
fn module_loaded(listing: &str, module: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().next() == Some(module))
}
