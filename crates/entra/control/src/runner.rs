//! Drives a reconciler from its work queue
//!
//! Keys are taken from the queue one at a time and each pass runs on its
//! own task, bounded by a semaphore and a per-pass deadline. The queue
//! guarantees a key is never in two passes at once.

use crate::config::ControllerConfig;
use crate::controller::{Action, Reconciler};
use crate::error::ControlError;
use crate::trigger::{ReconcileTrigger, WorkQueue};
use entra_types::ResourceKey;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tracing::Instrument;

/// Runs one controller kind
pub struct ControllerRunner {
    reconciler: Arc<dyn Reconciler>,
    queue: Arc<WorkQueue>,
    config: ControllerConfig,
}

impl ControllerRunner {
    pub fn new(reconciler: Arc<dyn Reconciler>, config: ControllerConfig) -> Arc<Self> {
        Arc::new(Self {
            reconciler,
            queue: Arc::new(WorkQueue::new()),
            config,
        })
    }

    pub fn kind(&self) -> &'static str {
        self.reconciler.kind()
    }

    /// Queue feeding this runner; record writes enqueue through it
    pub fn queue(&self) -> Arc<WorkQueue> {
        self.queue.clone()
    }

    /// Enqueues every key, e.g. the full record list at startup
    pub fn enqueue_all(&self, keys: impl IntoIterator<Item = ResourceKey>) {
        for key in keys {
            self.queue.enqueue(key);
        }
    }

    /// Runs a single pass for `key` under the pass deadline and returns the
    /// requeue decision.
    pub async fn run_once(&self, key: &ResourceKey) -> Action {
        let span = tracing::info_span!("reconcile", kind = self.kind(), resource = %key);
        let deadline = self.config.pass_timeout();

        async {
            let result = match tokio::time::timeout(deadline, self.reconciler.reconcile(key)).await
            {
                Ok(result) => result,
                Err(_) => Err(ControlError::Timeout(deadline)),
            };

            match result {
                Ok(action) => {
                    tracing::debug!(?action, "Reconcile pass finished");
                    action
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Reconcile pass failed");
                    self.reconciler.error_policy(key, &e)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn schedule(&self, key: ResourceKey, action: Action) {
        match action {
            Action::Requeue(delay) => self.queue.enqueue_after(key, delay),
            Action::AwaitChange => {}
        }
    }

    /// Processes keys until `shutdown` flips to true, then waits for the
    /// passes already running.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let limit = self.config.max_concurrent_reconciles.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));

        tracing::info!(kind = self.kind(), max_concurrent = limit, "Controller started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let key = tokio::select! {
                key = self.queue.next() => match key {
                    Some(key) => key,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let runner = self.clone();
            tokio::spawn(async move {
                let action = runner.run_once(&key).await;
                runner.queue.done(&key);
                runner.schedule(key, action);
                drop(permit);
            });
        }

        self.queue.shutdown();
        // Every permit back means every in-flight pass has finished
        let _ = semaphore.acquire_many(limit as u32).await;

        tracing::info!(kind = self.kind(), "Controller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Probe {
        calls: AtomicUsize,
        delay: Duration,
        seen: mpsc::UnboundedSender<ResourceKey>,
    }

    #[async_trait]
    impl Reconciler for Probe {
        fn kind(&self) -> &'static str {
            "Probe"
        }

        async fn reconcile(&self, key: &ResourceKey) -> ControlResult<Action> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let _ = self.seen.send(key.clone());
            Ok(Action::AwaitChange)
        }

        fn error_policy(&self, _key: &ResourceKey, _error: &ControlError) -> Action {
            Action::Requeue(Duration::from_secs(7))
        }
    }

    fn probe(delay: Duration) -> (Arc<Probe>, mpsc::UnboundedReceiver<ResourceKey>) {
        let (seen, rx) = mpsc::unbounded_channel();
        let probe = Arc::new(Probe {
            calls: AtomicUsize::new(0),
            delay,
            seen,
        });
        (probe, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_deadline_uses_error_policy() {
        let (probe, _rx) = probe(Duration::from_secs(3600));
        let config = ControllerConfig {
            pass_timeout_secs: 1,
            ..Default::default()
        };
        let runner = ControllerRunner::new(probe, config);

        let action = runner.run_once(&ResourceKey::new("team-a", "slow")).await;
        assert_eq!(action, Action::Requeue(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn test_run_processes_queued_keys_and_stops() {
        let (probe, mut rx) = probe(Duration::from_millis(1));
        let runner = ControllerRunner::new(probe.clone(), ControllerConfig::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        runner.enqueue_all(vec![
            ResourceKey::new("team-a", "one"),
            ResourceKey::new("team-a", "two"),
        ]);
        let handle = tokio::spawn(runner.clone().run(shutdown_rx));

        let mut seen = Vec::new();
        for _ in 0..2 {
            let key = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(key.name);
        }
        seen.sort();
        assert_eq!(seen, vec!["one".to_string(), "two".to_string()]);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        assert!(runner.queue().is_shutdown());
    }
}
