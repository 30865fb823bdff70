//! Periodic reload driver.

use crate::domain::Credentials;
use crate::loader::CredentialsLoader;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Drives a loader on a fixed interval until shut down.
///
/// The in-crate stand-in for an embedding scheduler: failures are logged and
/// the next tick is the retry policy. The loader serializes its own `load()`
/// calls, so a tick that fires while a slow load is still running simply
/// queues behind it.
pub struct Poller {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Spawn a background task reloading `loader` every `interval`
    pub fn spawn<C: Credentials>(
        loader: Arc<CredentialsLoader<C>>,
        interval: Duration,
    ) -> Self {
        let (shutdown, mut signal) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!(credential_type = %loader.type_name(), "Polling credentials definitions");
                        if let Err(error) = loader.load().await {
                            warn!(
                                credential_type = %loader.type_name(),
                                %error,
                                "Scheduled credentials reload failed; retrying on next tick"
                            );
                        }
                    }
                    _ = signal.changed() => break,
                }
            }
        });
        Self { shutdown, handle }
    }

    /// Stop polling and wait for the background task to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
