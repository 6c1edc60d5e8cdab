//! On-disk application state
//!
//! A usbshare directory (default `~/.usbshare`) holding `config.toml`. The
//! config file is the single source of configuration; `usbshare run` flags
//! override individual fields for one invocation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use common::gadget::{GadgetConfig, GadgetIdentity};

pub const CONFIG_FILE_NAME: &str = "config.toml";
const USBSHARE_DIR_NAME: &str = ".usbshare";

/// Contents of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Directory whose direct children are watched for changes.
    pub watch_path: PathBuf,
    /// Backing image file exposed to the USB host.
    pub image_path: PathBuf,
    /// Control loop cadence in seconds.
    pub poll_interval_secs: u64,
    /// Idle time after the last qualifying change before a reconnect.
    pub quiescence_secs: u64,
    /// Pause between the steps of the bounce sequence.
    pub settle_delay_secs: u64,
    /// Upper bound on a single external command.
    pub command_timeout_secs: u64,
    /// Number of logical units the gadget exposes.
    pub luns: u8,
    /// Present the gadget as a CD-ROM drive.
    pub cdrom: bool,
    /// Allow the gadget to halt bulk endpoints.
    pub stall: bool,
    /// Report the medium as removable.
    pub removable: bool,
    /// USB descriptor strings.
    pub serial: String,
    pub manufacturer: String,
    pub product: String,
    /// Default log level (`RUST_LOG` overrides).
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let gadget = GadgetConfig::new("/piusb.bin");
        Self {
            watch_path: PathBuf::from("/mnt/usb_share"),
            image_path: gadget.image_path,
            poll_interval_secs: 1,
            quiescence_secs: 5,
            settle_delay_secs: 1,
            command_timeout_secs: 10,
            luns: gadget.luns,
            cdrom: gadget.cdrom,
            stall: gadget.stall,
            removable: gadget.removable,
            serial: gadget.identity.serial,
            manufacturer: gadget.identity.manufacturer,
            product: gadget.identity.product,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Gadget parameters carried by this config.
    pub fn gadget(&self) -> GadgetConfig {
        GadgetConfig {
            image_path: self.image_path.clone(),
            luns: self.luns,
            cdrom: self.cdrom,
            stall: self.stall,
            removable: self.removable,
            identity: GadgetIdentity {
                serial: self.serial.clone(),
                manufacturer: self.manufacturer.clone(),
                product: self.product.clone(),
            },
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn quiescence(&self) -> Duration {
        Duration::from_secs(self.quiescence_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Loaded application state: the usbshare directory and its parsed config.
#[derive(Debug, Clone)]
pub struct AppState {
    pub usbshare_dir: PathBuf,
    pub config_path: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Resolve the usbshare directory, defaulting to `~/.usbshare`.
    pub fn default_dir() -> Result<PathBuf, StateError> {
        dirs::home_dir()
            .map(|home| home.join(USBSHARE_DIR_NAME))
            .ok_or(StateError::NoHomeDir)
    }

    /// Load state from `dir` (or the default directory).
    pub fn load(dir: Option<PathBuf>) -> Result<Self, StateError> {
        let usbshare_dir = match dir {
            Some(dir) => dir,
            None => Self::default_dir()?,
        };
        let config_path = usbshare_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::NotInitialized(config_path));
        }
        let raw = std::fs::read_to_string(&config_path)?;
        let config = toml::from_str(&raw)?;
        Ok(Self {
            usbshare_dir,
            config_path,
            config,
        })
    }

    /// Write `config` into `dir`, creating the directory if needed.
    ///
    /// Refuses to overwrite an existing config unless `force` is set.
    pub fn init(dir: &Path, config: &AppConfig, force: bool) -> Result<Self, StateError> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() && !force {
            return Err(StateError::AlreadyInitialized(config_path));
        }
        std::fs::create_dir_all(dir)?;
        let raw = toml::to_string_pretty(config)?;
        std::fs::write(&config_path, raw)?;
        Ok(Self {
            usbshare_dir: dir.to_path_buf(),
            config_path,
            config: config.clone(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("no config found at {0} (run `usbshare init` first)")]
    NotInitialized(PathBuf),

    #[error("config already exists at {0} (pass --force to overwrite)")]
    AlreadyInitialized(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    SerializeConfig(#[from] toml::ser::Error),
}
