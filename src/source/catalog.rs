//! Remote catalog client.
//!
//! The catalog is a tag search over an imageboard-style "dapi" endpoint.
//! Each query returns one page of post records as XML:
//!
//! ```text
//! <posts count="5" offset="0">
//!   <post file_url="//img.example/full/1.jpg" sample_url="//img.example/sample/1.jpg" ... />
//!   ...
//! </posts>
//! ```
//!
//! `count` is the total number of matches and `offset` the index of the first
//! record on this page. The page size is whatever number of records came back.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;

/// Default catalog endpoint.
pub const DEFAULT_CATALOG_ENDPOINT: &str = "https://gelbooru.com/index.php";

/// Default timeout for a single query or download.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Page Model
// =============================================================================

/// Which image of a post to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// The original upload (`file_url`)
    Full,
    /// The downscaled preview (`sample_url`)
    #[default]
    Sampled,
}

impl Resolution {
    /// Post attribute holding the URL for this resolution.
    pub fn attribute(self) -> &'static str {
        match self {
            Resolution::Full => "file_url",
            Resolution::Sampled => "sample_url",
        }
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage {
    /// Resolved image URLs, in catalog order
    pub urls: Vec<String>,
    /// Total number of matches for the query
    pub count: u64,
    /// Index of the first record on this page
    pub offset: u64,
    /// Number of post records on this page
    pub records: usize,
}

impl CatalogPage {
    /// Matches left after this page. May be negative if the server's
    /// numbers don't add up.
    pub fn remaining(&self) -> i64 {
        self.count as i64 - self.offset as i64 - self.records as i64
    }

    /// Whether no further page should be requested.
    ///
    /// A page that yields no usable URL ends pagination, even if its posts
    /// merely lacked the requested attribute.
    pub fn is_last(&self) -> bool {
        self.remaining() <= 0 || self.urls.is_empty()
    }
}

/// Parse a `<posts>` XML document.
///
/// Post URLs are resolved against `base`, so protocol-relative
/// (`//host/path`) and relative locations become absolute. Posts missing the
/// requested attribute are skipped but still count as records.
pub fn parse_post_list(
    xml: &str,
    resolution: Resolution,
    base: &Url,
) -> Result<CatalogPage, FetchError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| FetchError::Parse(e.to_string()))?;
    let root = doc.root_element();

    if !root.has_tag_name("posts") {
        return Err(FetchError::Parse(format!(
            "expected <posts>, got <{}>",
            root.tag_name().name()
        )));
    }

    let count = numeric_attribute(&root, "count")?;
    let offset = numeric_attribute(&root, "offset")?;

    let mut urls = Vec::new();
    let mut records = 0;
    for post in root.children().filter(|n| n.has_tag_name("post")) {
        records += 1;
        let Some(raw) = post.attribute(resolution.attribute()) else {
            warn!(
                attribute = resolution.attribute(),
                id = post.attribute("id").unwrap_or("?"),
                "Post has no image URL, skipping"
            );
            continue;
        };
        let url = base.join(raw).map_err(|e| FetchError::InvalidUrl {
            url: raw.to_string(),
            message: e.to_string(),
        })?;
        urls.push(url.to_string());
    }

    Ok(CatalogPage {
        urls,
        count,
        offset,
        records,
    })
}

fn numeric_attribute(node: &roxmltree::Node<'_, '_>, name: &str) -> Result<u64, FetchError> {
    let raw = node
        .attribute(name)
        .ok_or_else(|| FetchError::Parse(format!("<posts> is missing the '{}' attribute", name)))?;
    raw.trim()
        .parse()
        .map_err(|_| FetchError::Parse(format!("'{}' is not a number: {:?}", name, raw)))
}

// =============================================================================
// CatalogClient Trait
// =============================================================================

/// Fetch capability used by [`RemoteCatalogSource`](super::RemoteCatalogSource).
///
/// This abstraction keeps the pagination state machine independent of HTTP,
/// so it can be driven by an in-memory catalog in tests.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Query one page of results for `tags`.
    async fn fetch_page(
        &self,
        tags: &[String],
        page_index: u32,
        resolution: Resolution,
    ) -> Result<CatalogPage, FetchError>;

    /// Download the bytes behind an image URL.
    async fn download(&self, url: &str) -> Result<Bytes, FetchError>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// [`CatalogClient`] that talks to a dapi endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpCatalogClient {
    /// Create a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, FetchError> {
        let endpoint = Url::parse(endpoint).map_err(|e| FetchError::InvalidUrl {
            url: endpoint.to_string(),
            message: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rapidshow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Connection(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_page(
        &self,
        tags: &[String],
        page_index: u32,
        resolution: Resolution,
    ) -> Result<CatalogPage, FetchError> {
        let tags = tags.join(" ");
        let pid = page_index.to_string();

        debug!(tags = %tags, page = page_index, "Querying catalog");

        let body = self
            .http
            .get(self.endpoint.clone())
            .query(&[
                ("page", "dapi"),
                ("s", "post"),
                ("q", "index"),
                ("tags", tags.as_str()),
                ("pid", pid.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_post_list(&body, resolution, &self.endpoint)
    }

    async fn download(&self, url: &str) -> Result<Bytes, FetchError> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!(url, size = bytes.len(), "Downloaded image");
        Ok(bytes)
    }
}
