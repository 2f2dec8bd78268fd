//! Operation runner: runs one of {Refresh, Plan, Apply} under a
//! two-level cancellation hierarchy (stop, then a harder cancel).
//!
//! The runner does not know how to compute a plan or apply it; that
//! remains the driver's responsibility. It only orchestrates the worker
//! task, the stop/cancel race, and best-effort state flushing around a
//! driver-supplied worker body.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{CoreError, CoreResult};
use crate::manager::StateManager;

pub type WorkerFuture = Pin<Box<dyn Future<Output = CoreResult<()>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Refresh,
    Plan,
    Apply,
}

/// Cooperative signal handed to a worker body so it can poll for stop/cancel
/// between suspension points.
#[derive(Clone)]
pub struct WorkerContext {
    stop: watch::Receiver<bool>,
    cancel: watch::Receiver<bool>,
}

impl WorkerContext {
    pub fn is_stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    pub fn is_cancel_requested(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// A handle to an in-flight operation.
pub struct RunningOperation {
    stop_tx: watch::Sender<bool>,
    cancel_tx: watch::Sender<bool>,
    manager: Arc<StateManager>,
    worker: JoinHandle<CoreResult<()>>,
    stopped: Arc<AtomicBool>,
}

impl RunningOperation {
    /// Signals the worker's cooperative stop and immediately attempts a
    /// best-effort persist of whatever has been written into the state
    /// manager so far. Does not wait for the worker; call `join` for that.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.manager.persist_state().await {
            warn!(error = %e, "best-effort persist on stop failed");
        }
    }

    /// Abandons the worker without flushing state.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
        self.worker.abort();
    }

    /// Awaits the worker's completion. If `stop` was called, the result is
    /// always `Cancelled` regardless of what the worker itself returned.
    pub async fn join(mut self) -> CoreResult<()> {
        let outcome = (&mut self.worker).await;
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CoreError::Cancelled);
        }
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_join_error) => Err(CoreError::Cancelled),
        }
    }
}

/// Runs Refresh/Plan/Apply worker bodies for a workspace's state manager.
/// Stateless: every call is independent; retries are the driver's decision.
#[derive(Default)]
pub struct OperationRunner;

impl OperationRunner {
    pub fn new() -> Self {
        Self
    }

    /// Spawns `body` as the operation's worker task and returns immediately
    /// with a handle to it. `body` should poll the `WorkerContext`
    /// cooperatively and call `manager.write_state` as it makes progress.
    pub fn run(
        &self,
        kind: OperationKind,
        manager: Arc<StateManager>,
        body: impl FnOnce(WorkerContext) -> WorkerFuture + Send + 'static,
    ) -> RunningOperation {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let ctx = WorkerContext {
            stop: stop_rx,
            cancel: cancel_rx,
        };

        info!(?kind, "starting operation");
        let worker = tokio::spawn(body(ctx));

        RunningOperation {
            stop_tx,
            cancel_tx,
            manager,
            worker,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs an Apply, first soliciting approval from `approve` unless
    /// `auto_approve` is set. A rejected approval never starts
    /// the worker and reports `Cancelled`.
    pub async fn run_apply(
        &self,
        manager: Arc<StateManager>,
        auto_approve: bool,
        approve: impl Future<Output = bool>,
        body: impl FnOnce(WorkerContext) -> WorkerFuture + Send + 'static,
    ) -> CoreResult<RunningOperation> {
        if !auto_approve && !approve.await {
            return Err(CoreError::Cancelled);
        }
        Ok(self.run(OperationKind::Apply, manager, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::schema::StaticSchemaOracle;
    use crate::masking::MaskingEngine;
    use crate::objectstore::client::ObjectStoreClient;
    use crate::session::{BlobSession, LockInfo};
    use crate::state::StateDocument;
    use crate::testing::memory_objectstore::MemoryObjectStore;
    use crate::testing::memory_secretstore::MemorySecretStore;
    use std::time::Duration;

    fn manager() -> Arc<StateManager> {
        let store: Arc<dyn ObjectStoreClient> = Arc::new(MemoryObjectStore::new());
        let session = Arc::new(BlobSession::new("container", "dev.tfstate", store, "1.7.0"));
        let secret_store = Arc::new(MemorySecretStore::new());
        let oracle = Arc::new(StaticSchemaOracle::new());
        let masking = Arc::new(MaskingEngine::new(oracle, secret_store.clone()));
        Arc::new(StateManager::new(session, masking, secret_store))
    }

    #[tokio::test]
    async fn stop_flushes_partial_state_and_reports_cancelled() {
        let mgr = manager();
        mgr.refresh_state().await.unwrap();
        let lease_id = mgr
            .lock(LockInfo::new("Apply", "alice", "1.7.0"))
            .await
            .unwrap();

        let runner = OperationRunner::new();
        let worker_mgr = mgr.clone();
        let op = runner.run(OperationKind::Apply, mgr.clone(), move |ctx| {
            Box::pin(async move {
                worker_mgr.write_state(StateDocument::genesis("1.7.0")).await;
                loop {
                    if ctx.is_stop_requested() {
                        return Ok(());
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        op.stop().await;
        let err = op.join().await.unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));

        let state = mgr.state().await.unwrap();
        assert_eq!(state.serial, 1);
        mgr.unlock(&lease_id).await.unwrap();
    }

    #[tokio::test]
    async fn cancel_abandons_worker_without_flush() {
        let mgr = manager();
        mgr.refresh_state().await.unwrap();

        let runner = OperationRunner::new();
        let op = runner.run(OperationKind::Refresh, mgr.clone(), |_ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
        });

        op.cancel();
        let err = op.join().await.unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
    }

    #[tokio::test]
    async fn unapproved_apply_never_starts_worker() {
        let mgr = manager();
        let runner = OperationRunner::new();
        let result = runner
            .run_apply(mgr, false, async { false }, |_ctx| Box::pin(async { Ok(()) }))
            .await;
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }
}
