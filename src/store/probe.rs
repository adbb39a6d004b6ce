//! Background availability probe for the shared store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::store::SharedStore;

/// Probe the store every `interval` until shutdown.
pub fn spawn_probe(
    store: Arc<dyn SharedStore>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "Shared store probe starting");

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; connect already ran at startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let available = store.probe().await;
                    tracing::debug!(available, "Shared store probed");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Shared store probe received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingStore {
        probes: AtomicU32,
    }

    #[async_trait]
    impl SharedStore for CountingStore {
        fn is_available(&self) -> bool {
            true
        }

        async fn incr_with_expiry(&self, _key: &str, _ttl_secs: u64) -> Result<i64, StoreError> {
            Ok(1)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Option<u64>) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_runs_on_interval_until_shutdown() {
        let store = Arc::new(CountingStore::default());
        let (tx, rx) = broadcast::channel(1);

        let handle = spawn_probe(store.clone(), Duration::from_secs(10), rx);

        time::sleep(Duration::from_secs(35)).await;
        assert_eq!(store.probes.load(Ordering::SeqCst), 3);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
