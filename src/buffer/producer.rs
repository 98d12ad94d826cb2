//! Background producer loop.
//!
//! One iteration: ask the source for a location, read and decode it outside
//! the buffer lock, then insert the frame. Source errors that are not fatal
//! and broken images only cost one iteration.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::SlideBuffer;
use crate::error::{LoadError, ProducerError, SourceError};
use crate::frame::{Frame, Scaler};
use crate::source::{ImageSource, Location};

/// Handle to a running producer.
///
/// Dropping the handle does not stop the producer; call [`ProducerHandle::stop`].
pub struct ProducerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Result<(), SourceError>>,
}

impl ProducerHandle {
    pub(super) fn new(
        stop_tx: watch::Sender<bool>,
        task: JoinHandle<Result<(), SourceError>>,
    ) -> Self {
        Self { stop_tx, task }
    }

    /// Ask the producer to stop before its next iteration.
    ///
    /// A download or decode already in progress is allowed to finish.
    pub fn request_stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// True once the producer has exited, either stopped or failed.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the producer and wait for it to exit.
    pub async fn stop(self) -> Result<(), ProducerError> {
        self.request_stop();
        self.wait().await
    }

    /// Wait for the producer to exit without asking it to stop.
    ///
    /// Resolves with an error only if the source failed fatally or the task
    /// panicked.
    pub async fn wait(self) -> Result<(), ProducerError> {
        match self.task.await {
            Ok(result) => result.map_err(ProducerError::from),
            Err(e) => Err(ProducerError::Task(e.to_string())),
        }
    }
}

pub(super) async fn run_producer<S, D>(
    buffer: Arc<SlideBuffer>,
    mut source: S,
    scaler: Arc<D>,
    stop_rx: watch::Receiver<bool>,
) -> Result<(), SourceError>
where
    S: ImageSource,
    D: Scaler,
{
    info!("Slide producer started");

    loop {
        if *stop_rx.borrow() {
            info!("Slide producer stopped");
            return Ok(());
        }

        let location = match source.find_image().await {
            Ok(location) => location,
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Image source exhausted, producer exiting");
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, "No image this round, retrying");
                buffer.record_skip();
                // Immediate retry, but let other tasks on this worker run
                tokio::task::yield_now().await;
                continue;
            }
        };

        match load_frame(&location, &scaler).await {
            Ok(frame) => {
                let size = frame.dimensions();
                let evicted = buffer.insert(frame);
                debug!(
                    location = %location,
                    width = size.width,
                    height = size.height,
                    evicted = evicted.is_some(),
                    "Buffered slide"
                );
            }
            Err(e) => {
                warn!(location = %location, error = %e, "Skipping image");
                buffer.record_skip();
            }
        }
    }
}

async fn load_frame<D: Scaler>(location: &Location, scaler: &Arc<D>) -> Result<Frame, LoadError> {
    let bytes = tokio::fs::read(location.path())
        .await
        .map_err(|e| LoadError::Read {
            path: location.path().display().to_string(),
            message: e.to_string(),
        })?;

    let scaler = Arc::clone(scaler);
    let frame = tokio::task::spawn_blocking(move || scaler.decode_and_fit(&bytes))
        .await
        .map_err(|e| LoadError::Worker(e.to_string()))??;

    Ok(frame)
}
