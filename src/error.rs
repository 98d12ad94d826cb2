use thiserror::Error;

/// Errors raised while talking to the remote catalog.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The response body could not be interpreted as a post list
    #[error("Malformed catalog response: {0}")]
    Parse(String),

    /// A URL (endpoint or post location) could not be parsed
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match (e.status(), e.url()) {
            (Some(status), Some(url)) => FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            },
            _ => FetchError::Connection(e.to_string()),
        }
    }
}

/// Errors returned by an image source's `find_image`.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// No configured pattern matched a single image
    #[error("No images matched any of the configured paths")]
    Empty,

    /// The remote catalog never returned a single result
    #[error("The catalog returned no images for this query")]
    NoImagesAvailable,

    /// Catalog query or download failure
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Local disk failure (scratch storage, file reads)
    #[error("I/O error: {0}")]
    Io(String),
}

impl SourceError {
    /// Whether the error means the source can never produce an image again.
    ///
    /// The producer loop stops on fatal errors and skips the iteration on
    /// everything else.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Empty | SourceError::NoImagesAvailable)
    }
}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Io(e.to_string())
    }
}

/// Errors from decoding and scaling an image into a frame.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// Bytes are not a supported image
    #[error("Failed to decode image: {0}")]
    Image(String),

    /// Decoded image or display target has a zero dimension
    #[error("Cannot scale {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },

    /// Covering the display would need more pixels than a frame may hold
    #[error("Scaled size {width}x{height} exceeds the {limit} pixel frame limit")]
    TooLarge { width: u64, height: u64, limit: u64 },
}

impl From<image::ImageError> for DecodeError {
    fn from(e: image::ImageError) -> Self {
        DecodeError::Image(e.to_string())
    }
}

/// Errors from turning one location into a frame.
///
/// The producer logs these and moves on to the next image.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The image bytes could not be read
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    /// The bytes could not be decoded or scaled
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The blocking decode worker panicked or was cancelled
    #[error("Decode worker failed: {0}")]
    Worker(String),
}

/// Reasons a producer task ended other than a stop request.
#[derive(Debug, Clone, Error)]
pub enum ProducerError {
    /// The image source can no longer produce images
    #[error("Image source failed: {0}")]
    Source(#[from] SourceError),

    /// The producer task panicked or was aborted
    #[error("Producer task failed: {0}")]
    Task(String),
}

/// Errors from reading the slide buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// `sample` was called before any frame was inserted
    #[error("Slide buffer is empty; check fill_ratio() before sampling")]
    Empty,
}
