//! Foreground loop: follows the board's fastest-network advisories.

use crate::Result;
use crate::serial::SerialLine;
use crate::traits::{ConnectionController, SerialChannel};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a single line from the board led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Timeout or diagnostic output.
    Ignored,
    /// The host is already on the advised network.
    AlreadyConnected,
    Switched,
    SwitchFailed,
}

/// Consumes advisories and switches the host to the advised network.
///
/// This is the only writer of the tracked connection state.
pub struct SwitchListener {
    channel: Arc<dyn SerialChannel>,
    controller: Arc<dyn ConnectionController>,
    current_ssid: Option<String>,
}

impl SwitchListener {
    /// Seeds the tracked SSID from the host.
    pub async fn start(
        channel: Arc<dyn SerialChannel>,
        controller: Arc<dyn ConnectionController>,
    ) -> Self {
        let mut listener = Self {
            channel,
            controller,
            current_ssid: None,
        };
        listener.current_ssid = listener.query_current().await;
        listener
    }

    pub fn current_ssid(&self) -> Option<&str> {
        self.current_ssid.as_deref()
    }

    /// A failed query counts as "not connected", which lets the advisory
    /// through rather than suppressing it.
    async fn query_current(&self) -> Option<String> {
        match self.controller.current_ssid().await {
            Ok(ssid) => ssid,
            Err(e) => {
                tracing::warn!("Querying the active connection failed: {}", e);
                None
            }
        }
    }

    pub async fn handle_line(&mut self, line: SerialLine) -> SwitchOutcome {
        match line {
            SerialLine::Empty => SwitchOutcome::Ignored,
            SerialLine::Diagnostic(text) => {
                tracing::info!(device = %text, "[device]");
                SwitchOutcome::Ignored
            }
            SerialLine::FastestAdvisory(candidate) => self.follow_advisory(candidate).await,
        }
    }

    async fn follow_advisory(&mut self, candidate: String) -> SwitchOutcome {
        tracing::info!("New fastest: {}", candidate);

        // 决策前重新查询，手动切换等外部变化不会被本地缓存掩盖
        let current = self.query_current().await;
        if current.as_deref() == Some(candidate.as_str()) {
            tracing::debug!("Already connected to {}", candidate);
            return SwitchOutcome::AlreadyConnected;
        }

        match self.controller.switch_to(&candidate).await {
            Ok(()) => {
                tracing::info!("Switched from {:?} to {}", current, candidate);
                self.current_ssid = Some(candidate);
                SwitchOutcome::Switched
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.current_ssid = current;
                SwitchOutcome::SwitchFailed
            }
        }
    }

    /// Runs until `shutdown` is cancelled or the serial read fails.
    /// A read failure is returned: there is nothing left to listen on.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("Listening for new-fastest (now on: {:?})", self.current_ssid);
        loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::debug!("Switch listener stopped");
                    return Ok(());
                }
                line = self.channel.read_line() => line?,
            };
            self.handle_line(line).await;
        }
    }
}
