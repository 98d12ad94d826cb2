//! # rapidshow
//!
//! A preloading engine for high-rate image slideshows.
//!
//! Images come from local folders or from a paginated remote tag catalog.
//! A background producer decodes and scales them to the display size and
//! keeps them in a bounded, memory-aware buffer, from which the display
//! samples one at random every frame.
//!
//! ## Features
//!
//! - **Two sources**: directories, files and glob patterns, or a remote tag search
//! - **Disk-cached downloads**: remote images are kept in a scratch directory and
//!   replayed once the catalog runs dry
//! - **Fill scaling**: every frame covers the display with minimal overflow
//! - **Bounded buffer**: limit by frame count or by a fraction of system memory
//! - **Thread-safe sampling**: any number of readers alongside the producer
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`source`] - Image sources (filesystem and remote catalog)
//! - [`frame`] - Decoded frames and fill scaling
//! - [`buffer`] - Rolling slide buffer and its producer
//! - [`memory`] - Process memory probe
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rapidshow::{BufferConfig, Dimensions, FilesystemSource, ImageScaler, ProcessMemoryProbe, SlideBuffer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = FilesystemSource::new(&["photos/", "more/*.jpg"])?;
//!     let buffer = Arc::new(SlideBuffer::new(
//!         BufferConfig::count_bound(100, 25),
//!         Arc::new(ProcessMemoryProbe::new()),
//!     ));
//!
//!     let producer = buffer.start(source, ImageScaler::new(Dimensions::new(1920, 1080)));
//!
//!     while buffer.fill_ratio() < 1.0 {
//!         tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!     }
//!     let frame = buffer.sample()?;
//!     println!("showing {}x{}", frame.width(), frame.height());
//!
//!     producer.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod frame;
pub mod memory;
pub mod source;

// Re-export commonly used types
pub use buffer::{BufferConfig, BufferStats, CapacityBound, ProducerHandle, SlideBuffer};
pub use config::{CatalogConfig, Cli, DirConfig, SourceCommand};
pub use error::{BufferError, DecodeError, FetchError, LoadError, ProducerError, SourceError};
pub use frame::{fill_dimensions, scale_to_fill, Dimensions, Frame, ImageScaler, Scaler};
pub use memory::{MemoryProbe, ProcessMemoryProbe};
pub use source::{
    parse_post_list, CatalogClient, CatalogPage, CatalogQuery, FilesystemSource,
    HttpCatalogClient, ImageSource, Location, RemoteCatalogSource, Resolution,
};
