//! Local filesystem image source.
//!
//! All patterns are expanded once, at construction. Afterwards the source is a
//! fixed list of paths and `find_image` just samples from it.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use super::{is_image_path, ImageSource, Location};
use crate::error::SourceError;

/// Characters that turn a pattern into a glob.
const WILDCARDS: [char; 3] = ['*', '?', '['];

/// Image source over local files, directories and glob patterns.
///
/// # Example
///
/// ```ignore
/// use rapidshow::source::FilesystemSource;
///
/// // Mix of a glob, a directory and a single file
/// let source = FilesystemSource::new(&["shots/**/*.png", "wallpapers/", "cover.jpg"])?;
/// println!("{} images", source.len());
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemSource {
    images: Vec<PathBuf>,
}

impl FilesystemSource {
    /// Expand `patterns` into the set of images to show.
    ///
    /// Each pattern is handled as:
    /// - a glob when it contains `*`, `?` or `[`
    /// - the immediate children of an existing directory
    /// - an existing file
    ///
    /// Only regular files with an image extension are kept, each once, in
    /// order of first match. Patterns that match nothing are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Empty`] if no pattern produced an image.
    pub fn new<P: AsRef<str>>(patterns: &[P]) -> Result<Self, SourceError> {
        let mut images = Vec::new();
        let mut seen = HashSet::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let found = expand_pattern(pattern);
            debug!(pattern, count = found.len(), "Expanded path pattern");
            // Overlapping patterns must not weight a file more than once
            images.extend(found.into_iter().filter(|path| seen.insert(path.clone())));
        }

        if images.is_empty() {
            return Err(SourceError::Empty);
        }

        info!(count = images.len(), "Filesystem source ready");
        Ok(Self { images })
    }

    /// The expanded image list.
    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[async_trait]
impl ImageSource for FilesystemSource {
    async fn find_image(&mut self) -> Result<Location, SourceError> {
        self.images
            .choose(&mut rand::rng())
            .map(Location::local)
            .ok_or(SourceError::Empty)
    }
}

// =============================================================================
// Pattern Expansion
// =============================================================================

fn expand_pattern(pattern: &str) -> Vec<PathBuf> {
    if pattern.contains(WILDCARDS) {
        return expand_glob(pattern);
    }

    let path = Path::new(pattern);
    if path.is_dir() {
        list_directory(path)
    } else if path.is_file() && is_image_path(path) {
        vec![path.to_path_buf()]
    } else {
        Vec::new()
    }
}

fn expand_glob(pattern: &str) -> Vec<PathBuf> {
    let paths = match glob::glob(pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!(pattern, error = %e, "Ignoring invalid glob pattern");
            return Vec::new();
        }
    };

    paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable glob entry");
                None
            }
        })
        .filter(|path| path.is_file() && is_image_path(path))
        .collect()
}

fn list_directory(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list directory");
            return Vec::new();
        }
    };

    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image_path(path))
        .collect();
    images.sort();
    images
}
