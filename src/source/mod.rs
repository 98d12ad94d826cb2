//! Image source abstraction.
//!
//! A source hands out one image [`Location`] per call to
//! [`ImageSource::find_image`]. The slide buffer's producer is the only caller,
//! so sources keep their cursor state without any locking.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          SlideBuffer producer           │
//! └────────────────────┬────────────────────┘
//!                      │ find_image()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           ImageSource Trait             │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │FilesystemSource │    │ RemoteCatalogSource │
//! │ (glob/dir/file) │    │ (pages + disk cache)│
//! └─────────────────┘    └──────────┬──────────┘
//!                                   ▼
//!                        ┌─────────────────────┐
//!                        │   CatalogClient     │
//!                        │ (HTTP + XML posts)  │
//!                        └─────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rapidshow::source::{FilesystemSource, ImageSource};
//!
//! let mut source = FilesystemSource::new(&["~/Pictures/*.jpg", "/srv/wallpapers"])?;
//! let location = source.find_image().await?;
//! let bytes = tokio::fs::read(location.path()).await?;
//! ```

mod catalog;
mod filesystem;
mod remote;

pub use catalog::{
    parse_post_list, CatalogClient, CatalogPage, HttpCatalogClient, Resolution,
    DEFAULT_CATALOG_ENDPOINT, DEFAULT_REQUEST_TIMEOUT,
};
pub use filesystem::FilesystemSource;
pub use remote::{CachedFile, CatalogCursor, CatalogQuery, CursorState, RemoteCatalogSource};

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::SourceError;

/// File extensions accepted as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Check whether a path has one of the [`IMAGE_EXTENSIONS`].
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
        .unwrap_or(false)
}

// =============================================================================
// Location
// =============================================================================

/// Where to read one image from.
///
/// The path always points at local bytes. Images from a remote catalog also
/// carry the URL they were downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    path: PathBuf,
    url: Option<String>,
}

impl Location {
    /// A local file.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            url: None,
        }
    }

    /// A downloaded copy of `url` stored at `path`.
    pub fn cached(path: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: Some(url.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Origin URL for remote images.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(f, "{}", url),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

// =============================================================================
// ImageSource Trait
// =============================================================================

/// A supply of images for the slide buffer.
#[async_trait]
pub trait ImageSource: Send {
    /// Return the next image to load.
    ///
    /// Errors for which [`SourceError::is_fatal`] is false only affect this
    /// call; the caller may simply call again.
    async fn find_image(&mut self) -> Result<Location, SourceError>;
}

#[async_trait]
impl<S: ImageSource + ?Sized> ImageSource for Box<S> {
    async fn find_image(&mut self) -> Result<Location, SourceError> {
        (**self).find_image().await
    }
}
