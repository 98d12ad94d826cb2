//! Rolling slide buffer.
//!
//! A background producer keeps the buffer topped up with display-ready
//! frames while the display samples from it at its own pace.
//!
//! # Architecture
//!
//! ```text
//!   display thread(s)                     producer task
//! ┌───────────────────┐          ┌──────────────────────────────┐
//! │ fill_ratio()      │          │ find_image()     (no lock)   │
//! │ sample()          │          │ read + decode    (no lock)   │
//! └─────────┬─────────┘          │ insert + evict   (locked)    │
//!           │                    └──────────────┬───────────────┘
//!           ▼                                   ▼
//!        ┌────────────────────────────────────────────┐
//!        │     Mutex<VecDeque<Arc<Frame>>>            │
//!        │     oldest ◀──────────────────▶ newest     │
//!        └────────────────────────────────────────────┘
//! ```
//!
//! The lock is only ever held for a push, a pop or an index, so a slow
//! download or a large decode never stalls the display.
//!
//! # Capacity Bounds
//!
//! Exactly one bound is active per buffer:
//!
//! - [`CapacityBound::Count`]: at most `max_length` frames.
//! - [`CapacityBound::Memory`]: after each insertion, if the memory probe reads
//!   above `max_fraction`, the oldest frame is evicted once.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rapidshow::buffer::{BufferConfig, SlideBuffer};
//! use rapidshow::frame::{Dimensions, ImageScaler};
//! use rapidshow::memory::ProcessMemoryProbe;
//! use rapidshow::source::FilesystemSource;
//!
//! let buffer = Arc::new(SlideBuffer::new(
//!     BufferConfig::memory_bound(0.5, 25),
//!     Arc::new(ProcessMemoryProbe::new()),
//! ));
//! let source = FilesystemSource::new(&["photos/"])?;
//! let producer = buffer.start(source, ImageScaler::new(Dimensions::new(1920, 1080)));
//!
//! if buffer.fill_ratio() >= 1.0 {
//!     let frame = buffer.sample()?;
//! }
//!
//! producer.stop().await?;
//! ```

mod producer;
mod slide_buffer;

pub use producer::ProducerHandle;
pub use slide_buffer::{BufferStats, SlideBuffer};

/// Default number of frames needed before the buffer reports itself primed.
pub const DEFAULT_MINIMUM_PRIMED_LENGTH: usize = 25;

/// Default memory ceiling as a fraction of system memory.
pub const DEFAULT_MAX_MEMORY_FRACTION: f64 = 0.5;

/// Which resource limits the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapacityBound {
    /// Keep at most `max_length` frames
    Count { max_length: usize },
    /// Evict when memory usage exceeds `max_fraction` (0.0 to 1.0)
    Memory { max_fraction: f64 },
}

/// Buffer sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferConfig {
    /// Eviction policy
    pub bound: CapacityBound,

    /// Frames needed for `fill_ratio()` to reach 1. Independent of the bound.
    pub minimum_primed_length: usize,
}

impl BufferConfig {
    pub fn count_bound(max_length: usize, minimum_primed_length: usize) -> Self {
        Self {
            bound: CapacityBound::Count { max_length },
            minimum_primed_length,
        }
    }

    pub fn memory_bound(max_fraction: f64, minimum_primed_length: usize) -> Self {
        Self {
            bound: CapacityBound::Memory { max_fraction },
            minimum_primed_length,
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::memory_bound(DEFAULT_MAX_MEMORY_FRACTION, DEFAULT_MINIMUM_PRIMED_LENGTH)
    }
}
