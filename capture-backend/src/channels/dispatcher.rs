use super::capture::CaptureService;
use super::gateway::ChatGateway;
use crate::models::{InboundMessage, SessionId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Per-sender worker: a queue plus the task draining it
struct Worker {
    tx: mpsc::UnboundedSender<InboundMessage>,
    handle: JoinHandle<()>,
}

/// Dispatcher pulls messages from the gateway and hands them to the capture
/// service. Each sender gets its own queue, so one sender's messages are
/// handled in arrival order while different senders run concurrently.
pub struct CaptureDispatcher {
    service: Arc<CaptureService>,
    gateway: Arc<dyn ChatGateway>,
    workers: DashMap<SessionId, Worker>,
}

impl CaptureDispatcher {
    pub fn new(service: Arc<CaptureService>, gateway: Arc<dyn ChatGateway>) -> Self {
        Self {
            service,
            gateway,
            workers: DashMap::new(),
        }
    }

    /// Receive until the gateway closes, then let every queue drain
    pub async fn run(&self) {
        log::info!("[DISPATCH] Capture dispatcher started");
        while let Some(message) = self.gateway.receive_message().await {
            self.dispatch(message);
        }

        log::info!("[DISPATCH] Gateway closed, draining {} worker(s)", self.workers.len());
        self.shutdown().await;
    }

    /// Queue a message on its sender's worker, spawning the worker if needed
    pub fn dispatch(&self, message: InboundMessage) {
        let session_id = message.session_id;
        let mut worker = self
            .workers
            .entry(session_id)
            .or_insert_with(|| self.spawn_worker(session_id));

        if let Err(mpsc::error::SendError(message)) = worker.tx.send(message) {
            // The previous worker died (panicked handler); start a fresh one
            log::warn!("[DISPATCH] Worker for {} was gone, respawning", session_id);
            *worker = self.spawn_worker(session_id);
            if worker.tx.send(message).is_err() {
                log::error!("[DISPATCH] Dropped message for {}", session_id);
            }
        }
    }

    /// Number of live sender queues
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Close every queue and wait for queued messages to finish
    pub async fn shutdown(&self) {
        let session_ids: Vec<SessionId> = self.workers.iter().map(|e| *e.key()).collect();
        let mut handles = Vec::new();
        for session_id in session_ids {
            if let Some((_, worker)) = self.workers.remove(&session_id) {
                drop(worker.tx);
                handles.push((session_id, worker.handle));
            }
        }

        for (session_id, handle) in handles {
            if let Err(e) = handle.await {
                log::error!("[DISPATCH] Worker for {} ended abnormally: {}", session_id, e);
            }
        }
    }

    fn spawn_worker(&self, session_id: SessionId) -> Worker {
        let (tx, mut rx) = mpsc::unbounded_channel::<InboundMessage>();
        let service = Arc::clone(&self.service);
        let gateway = Arc::clone(&self.gateway);

        let handle = tokio::spawn(async move {
            log::debug!("[DISPATCH] Worker for {} started", session_id);
            while let Some(message) = rx.recv().await {
                service.handle(gateway.as_ref(), &message).await;
            }
            log::debug!("[DISPATCH] Worker for {} stopped", session_id);
        });

        Worker { tx, handle }
    }
}
