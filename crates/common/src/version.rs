//! Build information reported by `usbshare version`.

use std::fmt;

/// Version and build metadata baked in at compile time.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_timestamp: &'static str,
}

impl BuildInfo {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            build_timestamp: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "usbshare {} (built {})", self.version, self.build_timestamp)
    }
}
