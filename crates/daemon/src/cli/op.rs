//! The operation trait every CLI subcommand implements.

use std::path::PathBuf;

/// Shared context passed to every operation.
pub struct OpContext {
    /// Override for the usbshare directory (`--config-path` / `USBSHARE_DIR`).
    pub config_path: Option<PathBuf>,
}

#[async_trait::async_trait]
pub trait Op {
    type Error: std::error::Error;
    type Output: std::fmt::Display;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}
