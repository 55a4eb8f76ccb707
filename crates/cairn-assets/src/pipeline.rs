//! The loader thread and the channels feeding it.
//!
//! Requests flow to the worker over one channel and outcomes come back over
//! another, so the worker never touches registry state. A failed or panicking
//! load is still reported as a normal outcome.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cairn_core::profiling::profile_scope;

use crate::error::{AssetError, AssetResult};
use crate::io::BytesReader;
use crate::job::{JobState, LoadOutcome, LoadRequest, stage};

enum WorkerMessage {
    Load(LoadRequest),
    Shutdown,
}

/// A dedicated loader thread plus its submission and completion channels.
pub(crate) struct LoaderPipeline {
    request_tx: Sender<WorkerMessage>,
    outcome_rx: Receiver<LoadOutcome>,
    worker: Option<JoinHandle<()>>,
    submitted: usize,
    received: usize,
}

impl LoaderPipeline {
    pub fn spawn(name: &str, reader: Arc<dyn BytesReader>) -> AssetResult<Self> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage>();
        let (outcome_tx, outcome_rx) = mpsc::channel::<LoadOutcome>();

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || Self::worker_loop(request_rx, outcome_tx, reader))
            .map_err(|e| AssetError::WorkerUnavailable {
                message: format!("failed to spawn loader thread: {}", e),
            })?;

        tracing::debug!("Started loader thread {}", name);
        Ok(Self {
            request_tx,
            outcome_rx,
            worker: Some(worker),
            submitted: 0,
            received: 0,
        })
    }

    fn worker_loop(request_rx: Receiver<WorkerMessage>, outcome_tx: Sender<LoadOutcome>, reader: Arc<dyn BytesReader>) {
        while let Ok(msg) = request_rx.recv() {
            match msg {
                WorkerMessage::Load(request) => {
                    profile_scope!("load_request");
                    request.status.set(JobState::InProgress);
                    tracing::trace!("Deserializing {}", request.name);

                    let result = catch_unwind(AssertUnwindSafe(|| {
                        stage(
                            reader.as_ref(),
                            request.loader.as_ref(),
                            &request.name,
                            &request.locator,
                            request.asset_type,
                        )
                    }))
                    .unwrap_or_else(|_| Err(AssetError::loader(&request.name, "loader panicked during deserialize")));

                    request.status.set(if result.is_ok() {
                        JobState::Completed
                    } else {
                        JobState::Failed
                    });

                    let outcome = LoadOutcome {
                        id: request.id,
                        name: request.name,
                        result,
                    };
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
                WorkerMessage::Shutdown => break,
            }
        }
    }

    pub fn submit(&mut self, request: LoadRequest) -> AssetResult<()> {
        self.request_tx
            .send(WorkerMessage::Load(request))
            .map_err(|_| AssetError::WorkerUnavailable {
                message: "loader thread has stopped".to_string(),
            })?;
        self.submitted += 1;
        Ok(())
    }

    pub fn try_recv(&mut self) -> Option<LoadOutcome> {
        let outcome = self.outcome_rx.try_recv().ok()?;
        self.received += 1;
        Some(outcome)
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<LoadOutcome> {
        match self.outcome_rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.received += 1;
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::error!("Loader thread exited with {} jobs outstanding", self.outstanding());
                None
            }
        }
    }

    /// Requests submitted whose outcome has not been received yet.
    pub fn outstanding(&self) -> usize {
        self.submitted - self.received
    }
}

impl Drop for LoaderPipeline {
    fn drop(&mut self) {
        let _ = self.request_tx.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("Loader thread panicked during shutdown");
            }
        }
    }
}
