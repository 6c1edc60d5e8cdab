use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;

use cli::op::{Op, OpContext};
use cli::ops;

#[derive(Parser, Debug)]
#[command(name = "usbshare", about = "USB mass-storage gadget with automatic reconnect", version)]
struct Cli {
    /// Path to the usbshare directory (default: ~/.usbshare)
    #[arg(long, global = true, env = "USBSHARE_DIR")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a fresh config.toml
    Init(ops::Init),
    /// Run the daemon in the foreground until signalled
    Run(ops::Run),
    /// Show the loaded config and gadget module state
    Status(ops::Status),
    /// Print version and build info
    Version(ops::Version),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let ctx = OpContext {
        config_path: cli.config_path,
    };

    let result = match cli.command {
        Command::Init(op) => dispatch(op, &ctx).await,
        Command::Run(op) => dispatch(op, &ctx).await,
        Command::Status(op) => dispatch(op, &ctx).await,
        Command::Version(op) => dispatch(op, &ctx).await,
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(error) => {
            eprintln!("error: {error:#}");
            std::process::exit(1);
        }
    }
}

async fn dispatch<O: Op>(op: O, ctx: &OpContext) -> anyhow::Result<String>
where
    O::Error: Send + Sync + 'static,
{
    let output = op.execute(ctx).await.map_err(anyhow::Error::new)?;
    Ok(output.to_string())
}
