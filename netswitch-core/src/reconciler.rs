//! Background loop that keeps the board's credential list in sync with the host.

use crate::Result;
use crate::credentials::CredentialStore;
use crate::traits::SerialChannel;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    Updating,
}

/// Re-lists known in-range networks every interval and pushes a full
/// snapshot whenever the SSID set differs from the last one the board
/// accepted.
///
/// Never touches the host connection; switching belongs to the listener.
pub struct Reconciler {
    store: Arc<CredentialStore>,
    channel: Arc<dyn SerialChannel>,
    interval: Duration,
    last_sent: BTreeSet<String>,
    state: ReconcilerState,
}

impl Reconciler {
    /// `last_sent` is the SSID set of the snapshot pushed at startup.
    pub fn new(
        store: Arc<CredentialStore>,
        channel: Arc<dyn SerialChannel>,
        interval: Duration,
        last_sent: BTreeSet<String>,
    ) -> Self {
        Self {
            store,
            channel,
            interval,
            last_sent,
            state: ReconcilerState::Idle,
        }
    }

    pub fn state(&self) -> ReconcilerState {
        self.state
    }

    pub fn last_sent(&self) -> &BTreeSet<String> {
        &self.last_sent
    }

    /// One reconciliation pass. Returns whether a snapshot was pushed.
    ///
    /// On a write failure the remembered set is left alone, so the next
    /// pass sees the same difference and sends again.
    pub async fn tick(&mut self) -> Result<bool> {
        self.state = ReconcilerState::Updating;
        let result = self.update().await;
        self.state = ReconcilerState::Idle;
        result
    }

    async fn update(&mut self) -> Result<bool> {
        let networks = self.store.list().await;
        let ssids = networks.ssids();
        if ssids == self.last_sent {
            tracing::debug!("Known network set unchanged ({} networks)", ssids.len());
            return Ok(false);
        }

        tracing::info!("Wi-Fi list changed, updating device: {:?}", ssids);
        self.channel.write_snapshot(&networks).await?;
        tracing::info!("Sent {} networks to device", networks.len());
        self.last_sent = ssids;
        Ok(true)
    }

    /// Runs until `shutdown` is cancelled. The first pass happens one
    /// interval after start.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Reconciler stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.tick().await {
                tracing::warn!("Snapshot push failed, will retry next tick: {}", e);
            }
        }
    }
}
