//! Paginated remote catalog source with a local disk cache.
//!
//! The source walks a tag search one page at a time. Every result is
//! downloaded into a private scratch directory before it is handed out, and
//! once the catalog runs dry the downloaded files are replayed round-robin.
//!
//! # State Machine
//!
//! ```text
//!            pending non-empty
//!   ┌──────────────────────────────┐
//!   ▼                              │
//! Draining ──pending empty──▶ Fetching ──exhausted, nothing new──▶ Replaying
//!   (download one)          (query one page)                   (served[i], i = i+1 mod n)
//! ```
//!
//! The scratch directory lives exactly as long as the source. Dropping the
//! source removes it along with every cached file.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::catalog::{CatalogClient, CatalogPage, Resolution};
use super::{ImageSource, Location};
use crate::error::SourceError;

/// Prefix for scratch directories, to make leftovers easy to spot.
const SCRATCH_PREFIX: &str = "rapidshow-";

/// What to ask the catalog for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub tags: Vec<String>,
    pub resolution: Resolution,
}

impl CatalogQuery {
    pub fn new(tags: Vec<String>, resolution: Resolution) -> Self {
        Self { tags, resolution }
    }
}

/// A downloaded image and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    url: String,
    path: PathBuf,
}

impl CachedFile {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn location(&self) -> Location {
        Location::cached(&self.path, &self.url)
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Which branch the next `find_image` call will take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// URLs are queued; the next call downloads one
    Draining,
    /// Queue is empty and more pages may exist
    Fetching,
    /// Catalog is exhausted; downloaded files are replayed
    Replaying,
}

/// Pagination and replay bookkeeping.
///
/// A URL is either queued in `pending_urls` or, once downloaded, recorded in
/// `served_cache`; never both.
#[derive(Debug, Default)]
pub struct CatalogCursor {
    page_index: u32,
    pending_urls: VecDeque<String>,
    exhausted: bool,
    served_cache: Vec<CachedFile>,
    replay_cursor: usize,
}

impl CatalogCursor {
    pub fn state(&self) -> CursorState {
        if !self.pending_urls.is_empty() {
            CursorState::Draining
        } else if !self.exhausted {
            CursorState::Fetching
        } else {
            CursorState::Replaying
        }
    }

    /// Index of the next page to query.
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn pending_len(&self) -> usize {
        self.pending_urls.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Files downloaded so far, in download order.
    pub fn served(&self) -> &[CachedFile] {
        &self.served_cache
    }

    pub fn replay_cursor(&self) -> usize {
        self.replay_cursor
    }

    fn enqueue_page(&mut self, page: CatalogPage) {
        if page.is_last() {
            self.exhausted = true;
        }
        self.pending_urls.extend(page.urls);
        self.page_index += 1;
    }

    fn next_pending(&mut self) -> Option<String> {
        self.pending_urls.pop_front()
    }

    fn record_served(&mut self, file: CachedFile) {
        self.served_cache.push(file);
    }

    fn next_replay(&mut self) -> Option<&CachedFile> {
        if self.served_cache.is_empty() {
            return None;
        }
        let index = self.replay_cursor;
        self.replay_cursor = (index + 1) % self.served_cache.len();
        self.served_cache.get(index)
    }
}

// =============================================================================
// RemoteCatalogSource
// =============================================================================

/// Image source backed by a paginated remote catalog.
///
/// # Example
///
/// ```ignore
/// use rapidshow::source::{CatalogQuery, HttpCatalogClient, RemoteCatalogSource, Resolution};
///
/// let client = HttpCatalogClient::new(DEFAULT_CATALOG_ENDPOINT, DEFAULT_REQUEST_TIMEOUT)?;
/// let query = CatalogQuery::new(vec!["landscape".into()], Resolution::Sampled);
///
/// // Creates the scratch directory
/// let mut source = RemoteCatalogSource::new(client, query)?;
/// let location = source.find_image().await?;
///
/// // Removes the scratch directory and everything downloaded
/// source.close()?;
/// ```
pub struct RemoteCatalogSource<C> {
    client: C,
    query: CatalogQuery,
    cursor: CatalogCursor,
    scratch: TempDir,
}

impl<C: CatalogClient> RemoteCatalogSource<C> {
    /// Create a source with its scratch directory under the system temp dir.
    pub fn new(client: C, query: CatalogQuery) -> Result<Self, SourceError> {
        let scratch = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
        Ok(Self::with_scratch(client, query, scratch))
    }

    /// Create a source with its scratch directory under `root`.
    pub fn new_in(client: C, query: CatalogQuery, root: &Path) -> Result<Self, SourceError> {
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)?;
        Ok(Self::with_scratch(client, query, scratch))
    }

    fn with_scratch(client: C, query: CatalogQuery, scratch: TempDir) -> Self {
        info!(
            tags = %query.tags.join(" "),
            scratch = %scratch.path().display(),
            "Remote catalog source ready"
        );
        Self {
            client,
            query,
            cursor: CatalogCursor::default(),
            scratch,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    pub fn cursor(&self) -> &CatalogCursor {
        &self.cursor
    }

    pub fn query(&self) -> &CatalogQuery {
        &self.query
    }

    /// Remove the scratch directory, reporting any failure.
    ///
    /// Dropping the source also removes it, but silently.
    pub fn close(self) -> Result<(), SourceError> {
        let path = self.scratch.path().to_path_buf();
        self.scratch.close()?;
        debug!(scratch = %path.display(), "Removed scratch directory");
        Ok(())
    }

    async fn load_more_urls(&mut self) -> Result<(), SourceError> {
        let page_index = self.cursor.page_index();
        let page = self
            .client
            .fetch_page(&self.query.tags, page_index, self.query.resolution)
            .await?;

        info!(
            page = page_index,
            results = page.urls.len(),
            remaining = page.remaining(),
            "Fetched catalog page"
        );

        self.cursor.enqueue_page(page);
        if self.cursor.is_exhausted() {
            info!(pages = self.cursor.page_index(), "Catalog exhausted");
        }
        Ok(())
    }

    async fn cache_image(&mut self, url: String) -> Result<Location, SourceError> {
        let bytes = match self.client.download(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %url, error = %e, "Download failed, dropping URL");
                return Err(e.into());
            }
        };

        let path = self
            .scratch
            .path()
            .join(cache_file_name(self.cursor.served().len(), &url));
        tokio::fs::write(&path, &bytes).await?;

        debug!(url = %url, path = %path.display(), size = bytes.len(), "Cached image");

        let file = CachedFile { url, path };
        let location = file.location();
        self.cursor.record_served(file);
        Ok(location)
    }

    fn replay(&mut self) -> Result<Location, SourceError> {
        self.cursor
            .next_replay()
            .map(CachedFile::location)
            .ok_or(SourceError::NoImagesAvailable)
    }
}

#[async_trait]
impl<C: CatalogClient> ImageSource for RemoteCatalogSource<C> {
    async fn find_image(&mut self) -> Result<Location, SourceError> {
        if let Some(url) = self.cursor.next_pending() {
            return self.cache_image(url).await;
        }

        if !self.cursor.is_exhausted() {
            self.load_more_urls().await?;
            if let Some(url) = self.cursor.next_pending() {
                return self.cache_image(url).await;
            }
        }

        self.replay()
    }
}

/// Sequential file name keeping the URL's extension as a format hint.
fn cache_file_name(index: usize, url: &str) -> String {
    let extension = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase)
        })
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{:06}.{}", index, ext),
        None => format!("{:06}", index),
    }
}
