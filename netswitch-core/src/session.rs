//! Wires the startup push, the reconciler and the listener together.

use crate::credentials::CredentialStore;
use crate::listener::SwitchListener;
use crate::reconciler::Reconciler;
use crate::traits::{ConnectionController, KnownNetworkSet, SerialChannel};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// First listing at startup. Nothing known in range is fatal: the board
/// would have nothing to measure.
pub async fn discover_initial(store: &CredentialStore) -> Result<KnownNetworkSet> {
    let networks = store.list().await;
    if networks.is_empty() {
        return Err(Error::Discovery("no known networks in range".into()));
    }
    tracing::info!("Known in-range networks: {:?}", networks.ssids());
    Ok(networks)
}

pub struct Session {
    pub store: Arc<CredentialStore>,
    pub channel: Arc<dyn SerialChannel>,
    pub controller: Arc<dyn ConnectionController>,
    pub poll_interval: Duration,
}

impl Session {
    /// Pushes `initial` to the board, then runs the reconciler in the
    /// background and the listener in the foreground.
    ///
    /// Returns when `shutdown` is cancelled (`Ok`) or when the serial read
    /// fails (`Err`). The reconciler is stopped either way.
    pub async fn run(self, initial: KnownNetworkSet, shutdown: CancellationToken) -> Result<()> {
        self.channel.write_snapshot(&initial).await?;
        tracing::info!("Sent {} networks to device", initial.len());

        let listener = SwitchListener::start(self.channel.clone(), self.controller.clone()).await;

        let reconciler = Reconciler::new(
            self.store.clone(),
            self.channel.clone(),
            self.poll_interval,
            initial.ssids(),
        );
        let reconciler_shutdown = shutdown.child_token();
        let reconciler_task = tokio::spawn(reconciler.run(reconciler_shutdown.clone()));

        let result = listener.run(shutdown).await;

        reconciler_shutdown.cancel();
        if let Err(e) = reconciler_task.await {
            tracing::warn!("Reconciler task ended abnormally: {}", e);
        }
        result
    }
}
