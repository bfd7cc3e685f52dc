//! Notice sources and background reloads
//!
//! [`NoticeSource`] is anything that can produce the current notice list.
//! [`Reloader`] runs fetches on the tokio runtime so a presenter's event loop
//! never blocks on the network. A new request cancels the one in flight, and
//! only the result of the most recent request is ever delivered.

use std::{future::Future, sync::Arc};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::{Result, notices::Notice};

/// Supplies notices
pub trait NoticeSource: Send + Sync + 'static {
    fn fetch_notices(&self) -> impl Future<Output = Result<Vec<Notice>>> + Send;
}

type Outcome = (u64, Result<Vec<Notice>>);

/// Background fetcher where the newest request wins.
///
/// Must be used from within a tokio runtime.
pub struct Reloader<S> {
    source: Arc<S>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Outcome>,
    rx: mpsc::UnboundedReceiver<Outcome>,
}

impl<S: NoticeSource> Reloader<S> {
    pub fn new(source: Arc<S>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            generation: 0,
            in_flight: None,
            tx,
            rx,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Starts a fetch, cancelling any fetch still in flight.
    pub fn request(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            debug!(generation = self.generation, "cancelling superseded reload");
            handle.abort();
        }
        self.generation += 1;
        let generation = self.generation;
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = source.fetch_notices().await;
            // receiver is gone only if the reloader was dropped
            let _ = tx.send((generation, outcome));
        }));
    }

    /// True while the latest requested fetch has not been delivered
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns the latest fetch result if it has arrived. Results of
    /// superseded requests are discarded. A fetch task that ended without a
    /// result stops counting as loading.
    pub fn try_next(&mut self) -> Option<Result<Vec<Notice>>> {
        // checked before draining: a finished task has already sent its result
        let finished = self.in_flight.as_ref().is_some_and(JoinHandle::is_finished);
        while let Ok((generation, outcome)) = self.rx.try_recv() {
            if generation == self.generation {
                self.in_flight = None;
                return Some(outcome);
            }
            debug!(generation, latest = self.generation, "dropping stale reload result");
        }
        if finished {
            warn!(generation = self.generation, "reload task ended without a result");
            self.in_flight = None;
        }
        None
    }

    /// Waits for the latest fetch result. Returns None when nothing is loading,
    /// or if the fetch task ended without a result.
    pub async fn next_outcome(&mut self) -> Option<Result<Vec<Notice>>> {
        if let Some(outcome) = self.try_next() {
            return Some(outcome);
        }
        let handle = self.in_flight.take()?;
        if let Err(err) = handle.await {
            warn!("reload task ended without a result: {err}");
            return None;
        }
        self.try_next()
    }
}

impl<S> Drop for Reloader<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
