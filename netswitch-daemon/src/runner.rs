use crate::password;
use anyhow::{Context, Result};
use netswitch_core::backends::keyfile::{DirectRecordSource, SudoRecordSource};
use netswitch_core::backends::nmcli::NmcliBackend;
use netswitch_core::config::{AppConfig, Privilege, load_config};
use netswitch_core::credentials::CredentialStore;
use netswitch_core::serial::{SerialPortChannel, find_device};
use netswitch_core::session::{Session, discover_initial};
use netswitch_core::traits::RecordSource;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub port: Option<String>,
    pub interval: Option<u64>,
    pub direct: bool,
}

fn apply(mut config: AppConfig, overrides: Overrides) -> Result<AppConfig> {
    if let Some(port) = overrides.port {
        config.serial.port = Some(port);
    }
    if let Some(secs) = overrides.interval {
        anyhow::ensure!(secs > 0, "--interval must be at least 1 second");
        config.poll_interval = Duration::from_secs(secs);
    }
    if overrides.direct {
        config.credentials.privilege = Privilege::Direct;
    }
    Ok(config)
}

async fn record_source(config: &AppConfig) -> Result<Arc<dyn RecordSource>> {
    let dir = config.credentials.connections_dir.clone();
    let source: Arc<dyn RecordSource> = match config.credentials.privilege {
        Privilege::Direct => Arc::new(DirectRecordSource::new(dir)),
        Privilege::Sudo => {
            let password = password::obtain().await?;
            Arc::new(SudoRecordSource::new(dir, password))
        }
    };
    Ok(source)
}

/// Startup sequence, then the two loops until Ctrl-C or the board goes away.
pub async fn run(config_path: Option<&Path>, overrides: Overrides) -> Result<()> {
    let config = match config_path {
        Some(path) => load_config(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::default(),
    };
    let config = apply(config, overrides)?;

    // 1. 确定串口设备
    let port = match &config.serial.port {
        Some(port) => port.clone(),
        None => find_device(&config.serial.port_patterns).context("ESP32 serial port not found")?,
    };
    tracing::info!("📟 Using serial device {}", port);

    // 2. 构建凭据来源与 NetworkManager 后端
    let records = record_source(&config).await?;
    let nmcli = Arc::new(NmcliBackend::new(config.nmcli.clone()));
    let store = Arc::new(
        CredentialStore::new(records, nmcli.clone())
            .with_ssid_decoding(config.credentials.decode_escaped_ssids),
    );

    // 3. 首次扫描：没有已知且在范围内的网络则直接退出
    let initial = discover_initial(&store)
        .await
        .context("nothing to provision")?;

    let channel = SerialPortChannel::open(
        &port,
        config.serial.baud_rate,
        config.serial.read_timeout,
        config.serial.settle,
    )
    .await
    .with_context(|| format!("failed to open serial port {}", port))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("🛑 Interrupted, stopping...");
                shutdown.cancel();
            }
        }
    });

    let session = Session {
        store,
        channel: Arc::new(channel),
        controller: nmcli,
        poll_interval: config.poll_interval,
    };
    session
        .run(initial, shutdown)
        .await
        .context("lost the serial link")?;

    tracing::info!("🛑 Shutting down.");
    Ok(())
}
