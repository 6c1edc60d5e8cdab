//! USB mass-storage gadget command construction
//!
//! The gadget is driven through the `g_multi` kernel module: loading it with
//! a backing file exposes that file to the USB host as a mass-storage device,
//! unloading it detaches the device. This module builds the exact command
//! lines; running them is the [`CommandRunner`](crate::command::CommandRunner)'s job.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kernel module implementing the mass-storage gadget.
pub const MODULE_NAME: &str = "g_multi";

/// USB descriptor strings presented to the connected host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GadgetIdentity {
    pub serial: String,
    pub manufacturer: String,
    pub product: String,
}

impl Default for GadgetIdentity {
    fn default() -> Self {
        Self {
            serial: "USBSHARE0001".to_string(),
            manufacturer: "RaspberryPi".to_string(),
            product: "USB Share Storage".to_string(),
        }
    }
}

/// Everything needed to parametrize the attach command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GadgetConfig {
    /// Flat file acting as the block device content.
    pub image_path: PathBuf,
    /// Number of logical units to expose.
    pub luns: u8,
    /// Present the device as a CD-ROM drive.
    pub cdrom: bool,
    /// Allow the gadget to halt bulk endpoints.
    pub stall: bool,
    /// Report the medium as removable.
    pub removable: bool,
    pub identity: GadgetIdentity,
}

impl GadgetConfig {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            luns: 1,
            cdrom: false,
            stall: false,
            removable: true,
            identity: GadgetIdentity::default(),
        }
    }

    /// Command line that attaches the gadget to the USB bus.
    pub fn load_command(&self) -> String {
        format!(
            "modprobe {MODULE_NAME} file={} luns={} cdrom={} stall={} removable={} \
             iSerial=\"{}\" iManufacturer=\"{}\" iProduct=\"{}\"",
            self.image_path.display(),
            self.luns,
            self.cdrom as u8,
            self.stall as u8,
            self.removable as u8,
            self.identity.serial,
            self.identity.manufacturer,
            self.identity.product,
        )
    }

    /// Command line that detaches the gadget from the USB bus.
    pub fn unload_command(&self) -> String {
        format!("modprobe -r {MODULE_NAME}")
    }

    /// Command line that flushes filesystem buffers to the backing file.
    pub fn flush_command(&self) -> String {
        "sync".to_string()
    }
}
