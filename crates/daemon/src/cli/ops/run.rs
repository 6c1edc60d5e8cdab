use std::path::PathBuf;

use clap::Args;

use usbshare_daemon::service::{self, ServiceError};
use usbshare_daemon::state::{AppState, StateError};

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Run {
    /// Override the watched directory for this invocation
    #[arg(long)]
    pub watch_path: Option<PathBuf>,

    /// Override the backing image file for this invocation
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Override the quiescence threshold in seconds
    #[arg(long)]
    pub quiescence_secs: Option<u64>,

    /// Override the poll interval in seconds
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),

    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),

    #[error("service failed: {0}")]
    Service(#[from] ServiceError),
}

#[async_trait::async_trait]
impl Op for Run {
    type Error = RunError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut state = AppState::load(ctx.config_path.clone())?;

        if let Some(watch_path) = &self.watch_path {
            state.config.watch_path = watch_path.clone();
        }
        if let Some(image) = &self.image {
            state.config.image_path = image.clone();
        }
        if let Some(quiescence_secs) = self.quiescence_secs {
            state.config.quiescence_secs = quiescence_secs;
        }
        if let Some(poll_interval_secs) = self.poll_interval_secs {
            state.config.poll_interval_secs = poll_interval_secs;
        }

        let log_level: tracing::Level = state
            .config
            .log_level
            .parse()
            .map_err(|_| RunError::InvalidLogLevel(state.config.log_level.clone()))?;

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(log_level.into()),
            )
            .init();

        let config = service::Config {
            watch_path: state.config.watch_path.clone(),
            gadget: state.config.gadget(),
            poll_interval: state.config.poll_interval(),
            quiescence: state.config.quiescence(),
            settle_delay: state.config.settle_delay(),
            command_timeout: state.config.command_timeout(),
        };

        service::start_service(&config).await?;
        Ok("daemon ended".to_string())
    }
}
