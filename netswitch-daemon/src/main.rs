mod password;
mod runner;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Keeps a serial Wi-Fi scanner provisioned with the host's known networks
/// and follows its fastest-network advice.
#[derive(Parser, Debug)]
#[command(name = "netswitch", version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial device to use instead of discovering one
    #[arg(short, long, value_name = "DEVICE")]
    port: Option<String>,

    /// Seconds between credential reconciliation passes
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Read credential files directly instead of through sudo
    #[arg(long)]
    direct: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. 初始化日志（这是入口点的职责）
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let overrides = runner::Overrides {
        port: args.port,
        interval: args.interval,
        direct: args.direct,
    };

    // 2. 调用核心流程
    if let Err(e) = runner::run(args.config.as_deref(), overrides).await {
        // 3. 处理顶层错误
        tracing::error!("❌ netswitch failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
