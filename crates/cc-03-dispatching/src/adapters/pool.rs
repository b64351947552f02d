//! Worker pool running the dispatcher.
//!
//! Inbound envelopes are queued on a bounded channel; a fixed number of
//! workers drain it concurrently. Callers outside the pool wait for room.
//! A worker never does: answers it produces while the queue is full are
//! handed to a detached task, since only workers make room.

use crate::domain::DispatchError;
use crate::service::Dispatcher;
use shared_types::Envelope;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

tokio::task_local! {
    /// Set while a pool worker is dispatching an envelope.
    static DISPATCH_WORKER: usize;
}

/// Cloneable entry point of a [`DispatchPool`].
#[derive(Clone)]
pub struct DispatchHandle {
    sender: mpsc::Sender<Envelope>,
}

impl DispatchHandle {
    /// Queue an envelope for dispatching.
    ///
    /// Outside the pool this waits for room if the pool is busy. From inside
    /// a worker it returns at once.
    pub async fn submit(&self, envelope: Envelope) -> Result<(), DispatchError> {
        match DISPATCH_WORKER.try_with(|worker_id| *worker_id) {
            Ok(worker_id) => self.submit_from_worker(worker_id, envelope),
            Err(_) => self
                .sender
                .send(envelope)
                .await
                .map_err(|_| DispatchError::QueueClosed),
        }
    }

    fn submit_from_worker(&self, worker_id: usize, envelope: Envelope) -> Result<(), DispatchError> {
        match self.sender.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(DispatchError::QueueClosed),
            Err(TrySendError::Full(envelope)) => {
                debug!(
                    worker_id,
                    message_id = %envelope.message_id(),
                    "dispatch queue full, handing envelope off"
                );
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    if let Err(e) = sender.send(envelope).await {
                        warn!(
                            message_id = %e.0.message_id(),
                            "dispatch queue closed before envelope could be queued"
                        );
                    }
                });
                Ok(())
            }
        }
    }
}

pub struct DispatchPool {
    handle: DispatchHandle,
    workers: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl DispatchPool {
    /// Spawn `worker_count` workers sharing a queue of `capacity` envelopes.
    pub fn start(dispatcher: Arc<Dispatcher>, worker_count: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker_count = worker_count.max(1);

        let workers = (0..worker_count)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let dispatcher = dispatcher.clone();
                let mut shutdown = shutdown_rx.clone();
                tokio::spawn(async move {
                    loop {
                        // Queued work wins over the stop signal so shutdown drains.
                        let next = tokio::select! {
                            biased;
                            next = async { receiver.lock().await.recv().await } => next,
                            _ = shutdown.changed() => None,
                        };
                        let Some(envelope) = next else {
                            break;
                        };
                        DISPATCH_WORKER
                            .scope(worker_id, dispatcher.dispatch(envelope))
                            .await;
                    }
                    debug!(worker_id, "dispatch worker stopped");
                })
            })
            .collect();

        info!(worker_count, capacity, "dispatch pool started");
        Self {
            handle: DispatchHandle { sender },
            workers,
            shutdown_tx,
        }
    }

    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Stop the workers once the queue is empty and wait for them.
    ///
    /// Submitting through a handle fails after the workers are gone.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for worker in self.workers {
            let _ = worker.await;
        }
        info!("dispatch pool stopped");
    }
}
