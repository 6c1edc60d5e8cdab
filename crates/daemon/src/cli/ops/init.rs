use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use usbshare_daemon::state::{AppConfig, AppState, StateError};

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Directory to watch for changes (default: /mnt/usb_share)
    #[arg(long)]
    pub watch_path: Option<PathBuf>,

    /// Backing image file exposed over USB (default: /piusb.bin)
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Idle seconds after the last change before reconnecting (default: 5)
    #[arg(long)]
    pub quiescence_secs: Option<u64>,

    /// USB serial number string
    #[arg(long)]
    pub serial: Option<String>,

    /// USB manufacturer string
    #[arg(long)]
    pub manufacturer: Option<String>,

    /// USB product string
    #[arg(long)]
    pub product: Option<String>,

    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug)]
pub struct InitOutput {
    pub usbshare_dir: PathBuf,
    pub config_path: PathBuf,
    pub watch_path: PathBuf,
    pub image_path: PathBuf,
    pub quiescence_secs: u64,
}

impl fmt::Display for InitOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} usbshare at {}",
            "Initialized".green().bold(),
            self.usbshare_dir.display().to_string().bold()
        )?;
        writeln!(f, "  {} {}", "Config:".dimmed(), self.config_path.display())?;
        writeln!(f, "  {} {}", "Watching:".dimmed(), self.watch_path.display())?;
        writeln!(f, "  {} {}", "Image:".dimmed(), self.image_path.display())?;
        write!(f, "  {} {}s", "Quiescence:".dimmed(), self.quiescence_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl Op for Init {
    type Error = InitError;
    type Output = InitOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let dir = match &ctx.config_path {
            Some(dir) => dir.clone(),
            None => AppState::default_dir()?,
        };

        let mut config = AppConfig::default();
        if let Some(watch_path) = &self.watch_path {
            config.watch_path = watch_path.clone();
        }
        if let Some(image) = &self.image {
            config.image_path = image.clone();
        }
        if let Some(quiescence_secs) = self.quiescence_secs {
            config.quiescence_secs = quiescence_secs;
        }
        if let Some(serial) = &self.serial {
            config.serial = serial.clone();
        }
        if let Some(manufacturer) = &self.manufacturer {
            config.manufacturer = manufacturer.clone();
        }
        if let Some(product) = &self.product {
            config.product = product.clone();
        }

        let state = AppState::init(&dir, &config, self.force)?;

        Ok(InitOutput {
            usbshare_dir: state.usbshare_dir,
            config_path: state.config_path,
            watch_path: state.config.watch_path,
            image_path: state.config.image_path,
            quiescence_secs: state.config.quiescence_secs,
        })
    }
}
