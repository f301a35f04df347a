//! Single-worker operation dispatcher.
//!
//! All engine interaction happens on one worker task that drains a FIFO
//! mailbox. Each request runs to completion (success, failure or panic)
//! before the next one starts, so the engine is never entered twice at once
//! and requests execute in submission order. Submitting never blocks: the
//! caller receives a [`Pending`] handle that resolves to exactly one outcome.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::engine::MediaEngine;
use crate::error::{Error, Result};
use crate::paths::{PathResolver, StoragePurpose};
use crate::payload::FromPayload;
use crate::request::{Operation, OperationKind};
use crate::translate::{OperationOutcome, translate};

/// Identifier assigned to each submitted request.
pub type RequestId = u64;

/// A queued request together with the handle for its reply.
struct Job {
    id: RequestId,
    operation: Operation,
    reply: oneshot::Sender<OperationOutcome>,
}

/// Serializes operations onto the engine worker.
#[derive(Debug)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Job>,
    next_id: AtomicU64,
}

impl Dispatcher {
    /// Start the worker.
    ///
    /// Must be called from within a Tokio runtime. The worker owns the engine
    /// and runs until every `Dispatcher` handle is dropped and the queue is
    /// drained.
    pub fn spawn(engine: Arc<dyn MediaEngine>, resolver: Arc<PathResolver>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, engine, resolver));
        info!("Operation dispatcher started");

        Self {
            tx,
            next_id: AtomicU64::new(0),
        }
    }

    /// Queue an operation. Returns immediately.
    pub fn submit<T: FromPayload>(&self, operation: Operation) -> Pending<T> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let kind = operation.kind();
        let (reply, rx) = oneshot::channel();

        debug!("Queueing request {} ({})", id, kind);
        if self
            .tx
            .send(Job {
                id,
                operation,
                reply,
            })
            .is_err()
        {
            // The reply sender was dropped with the job, so the handle
            // resolves to `DispatcherClosed`.
            error!("Dispatcher worker is gone; request {} ({}) rejected", id, kind);
        }

        Pending {
            id,
            kind,
            rx,
            _payload: PhantomData,
        }
    }
}

/// Handle to the eventual result of a submitted request.
#[derive(Debug)]
#[must_use = "a pending result does nothing unless awaited"]
pub struct Pending<T> {
    id: RequestId,
    kind: OperationKind,
    rx: oneshot::Receiver<OperationOutcome>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Pending<T> {
    /// Identifier of the request.
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Operation the request addresses.
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Wait for the raw outcome instead of a typed result.
    pub async fn outcome(self) -> Option<OperationOutcome> {
        self.rx.await.ok()
    }
}

impl<T: FromPayload> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome.into_result(this.kind)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::DispatcherClosed)),
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    engine: Arc<dyn MediaEngine>,
    resolver: Arc<PathResolver>,
) {
    while let Some(job) = rx.recv().await {
        let Job {
            id,
            operation,
            reply,
        } = job;
        let kind = operation.kind();
        debug!("Running request {} ({})", id, kind);

        let engine = Arc::clone(&engine);
        let resolver = Arc::clone(&resolver);
        // The worker awaits the blocking call before taking the next job.
        let outcome = match tokio::task::spawn_blocking(move || {
            execute(engine.as_ref(), &resolver, &operation)
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Request {} ({}) crashed: {}", id, kind, e);
                OperationOutcome::runtime_failure(kind, panic_message(e))
            }
        };

        match outcome.failure_message() {
            None => info!("Request {} ({}) succeeded", id, kind),
            Some(message) => warn!("Request {} ({}) failed: {}", id, kind, message),
        }

        if reply.send(outcome).is_err() {
            warn!("Caller for request {} ({}) went away; result discarded", id, kind);
        }
    }
    info!("Operation dispatcher stopped");
}

/// Run one operation against the engine. Called only on the worker.
fn execute(
    engine: &dyn MediaEngine,
    resolver: &PathResolver,
    operation: &Operation,
) -> OperationOutcome {
    let kind = operation.kind();
    let raw = match operation {
        Operation::GetVideoInfo { url } => engine.get_video_info(url),
        Operation::GetPlaylistInfo { url } => engine.get_playlist_info(url),
        Operation::DownloadVideo { url, format_id } => {
            let dir = match resolver.resolve(StoragePurpose::Downloads) {
                Ok(dir) => dir,
                Err(e) => return OperationOutcome::runtime_failure(kind, e),
            };
            debug!("Download directory: {}", dir.display());
            engine.download_video(url, &dir, format_id)
        }
        Operation::DownloadThumbnail { video_id, url } => {
            let dir = match resolver.resolve(StoragePurpose::Pictures) {
                Ok(dir) => dir,
                Err(e) => return OperationOutcome::runtime_failure(kind, e),
            };
            engine.download_thumbnail(url, video_id, &dir)
        }
        Operation::TestEngine => engine.test(),
    };

    match raw {
        Ok(text) => translate(&text, kind),
        Err(e) => OperationOutcome::runtime_failure(kind, e),
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "worker task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "engine panicked".to_string()
    }
}
