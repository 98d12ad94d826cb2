use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::watch;
use tracing::trace;

use super::producer::{run_producer, ProducerHandle};
use super::{BufferConfig, CapacityBound};
use crate::error::BufferError;
use crate::frame::{Frame, Scaler};
use crate::memory::MemoryProbe;
use crate::source::ImageSource;

/// Counters describing buffer activity since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Frames currently held
    pub len: usize,
    /// Frames ever inserted
    pub inserted: u64,
    /// Frames evicted to honour the bound
    pub evicted: u64,
    /// Producer iterations that did not yield a frame
    pub skipped: u64,
}

/// Bounded, thread-safe rolling window of display-ready frames.
///
/// Frames are evicted oldest-first. Readers get shared `Arc<Frame>` handles,
/// so an evicted frame stays valid for anyone still displaying it.
pub struct SlideBuffer {
    frames: Mutex<VecDeque<Arc<Frame>>>,
    config: BufferConfig,
    probe: Arc<dyn MemoryProbe>,
    inserted: AtomicU64,
    evicted: AtomicU64,
    skipped: AtomicU64,
}

impl SlideBuffer {
    /// Create an empty buffer.
    ///
    /// # Arguments
    /// * `config` - Bound and priming threshold
    /// * `probe` - Memory probe, consulted only under [`CapacityBound::Memory`]
    pub fn new(config: BufferConfig, probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            config,
            probe,
            inserted: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Start the background producer.
    ///
    /// Must be called from within a tokio runtime. The producer runs until
    /// [`ProducerHandle::stop`] is called or the source fails fatally.
    pub fn start<S, D>(self: &Arc<Self>, source: S, scaler: D) -> ProducerHandle
    where
        S: ImageSource + 'static,
        D: Scaler,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_producer(
            Arc::clone(self),
            source,
            Arc::new(scaler),
            stop_rx,
        ));
        ProducerHandle::new(stop_tx, task)
    }

    /// Append a frame, evicting the oldest one if the bound is now exceeded.
    ///
    /// Returns the evicted frame, if any. At most one frame is evicted per
    /// insertion.
    pub fn insert(&self, frame: Frame) -> Option<Arc<Frame>> {
        let mut frames = self.frames.lock();
        frames.push_back(Arc::new(frame));

        let over_capacity = match self.config.bound {
            CapacityBound::Count { max_length } => frames.len() > max_length,
            CapacityBound::Memory { max_fraction } => self.probe.usage_fraction() > max_fraction,
        };
        let evicted = if over_capacity {
            frames.pop_front()
        } else {
            None
        };
        let len = frames.len();
        drop(frames);

        self.inserted.fetch_add(1, Ordering::Relaxed);
        if evicted.is_some() {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        trace!(len, evicted = evicted.is_some(), "Inserted frame");
        evicted
    }

    /// How close the buffer is to being primed, in `[0, 1]`.
    ///
    /// Under a memory bound the buffer also counts as primed when memory is
    /// already at the ceiling, since it cannot grow any further.
    pub fn fill_ratio(&self) -> f64 {
        if let CapacityBound::Memory { max_fraction } = self.config.bound {
            if self.probe.usage_fraction() >= max_fraction {
                return 1.0;
            }
        }
        let len = self.frames.lock().len();
        primed_ratio(len, self.config.minimum_primed_length)
    }

    /// Pick a frame uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Empty`] before the first frame arrives. Check
    /// [`SlideBuffer::fill_ratio`] first.
    pub fn sample(&self) -> Result<Arc<Frame>, BufferError> {
        let frames = self.frames.lock();
        if frames.is_empty() {
            return Err(BufferError::Empty);
        }
        let index = rand::rng().random_range(0..frames.len());
        Ok(Arc::clone(&frames[index]))
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            len: self.len(),
            inserted: self.inserted.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

fn primed_ratio(len: usize, minimum_primed_length: usize) -> f64 {
    if minimum_primed_length == 0 {
        return 1.0;
    }
    (len as f64 / minimum_primed_length as f64).min(1.0)
}
