//! Configuration management for rapidshow.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `RAPIDSHOW_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use rapidshow::config::{Cli, SourceCommand};
//!
//! let cli = Cli::parse();
//! cli.validate()?;
//!
//! match &cli.source {
//!     SourceCommand::Dir(dir) => println!("{} patterns", dir.patterns.len()),
//!     SourceCommand::Gel(gel) => println!("tags: {}", gel.tags.join(" ")),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RAPIDSHOW_FPS` - Display rate in frames per second (default: 60)
//! - `RAPIDSHOW_MAX_MEMORY` - Memory ceiling in percent of system memory (default: 50)
//! - `RAPIDSHOW_BUFFER` - Frames needed before display starts (default: 25)
//! - `RAPIDSHOW_MAX_SLIDES` - Fixed frame limit, replaces the memory ceiling
//! - `RAPIDSHOW_WIDTH` / `RAPIDSHOW_HEIGHT` - Display size (default: 1920x1080)
//! - `RAPIDSHOW_ENDPOINT` - Catalog endpoint for `gel` (default: gelbooru)
//! - `RAPIDSHOW_TIMEOUT` - Catalog request timeout in seconds (default: 30)

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::buffer::{BufferConfig, DEFAULT_MINIMUM_PRIMED_LENGTH};
use crate::frame::Dimensions;
use crate::source::{CatalogQuery, Resolution, DEFAULT_CATALOG_ENDPOINT};

// =============================================================================
// Default Values
// =============================================================================

/// Default display rate.
pub const DEFAULT_FPS: u32 = 60;

/// Default memory ceiling, in percent of system memory.
pub const DEFAULT_MAX_MEMORY_PERCENT: f64 = 50.0;

/// Default display width.
pub const DEFAULT_WIDTH: u32 = 1920;

/// Default display height.
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Default catalog request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CLI Arguments
// =============================================================================

/// rapidshow - Display slides. Fast.
///
/// Preloads images from local folders or a tag search into a memory-aware
/// buffer and shows a random one every frame.
#[derive(Parser, Debug, Clone)]
#[command(name = "rapidshow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // =========================================================================
    // Display Configuration
    // =========================================================================
    /// Rate at which new slides are shown.
    #[arg(short, long, default_value_t = DEFAULT_FPS, env = "RAPIDSHOW_FPS")]
    pub fps: u32,

    /// Display width in pixels; slides are scaled to cover it.
    #[arg(long, default_value_t = DEFAULT_WIDTH, env = "RAPIDSHOW_WIDTH")]
    pub width: u32,

    /// Display height in pixels; slides are scaled to cover it.
    #[arg(long, default_value_t = DEFAULT_HEIGHT, env = "RAPIDSHOW_HEIGHT")]
    pub height: u32,

    // =========================================================================
    // Buffer Configuration
    // =========================================================================
    /// Maximum memory usage, as a percentage of total memory.
    #[arg(
        short = 'm',
        long = "mem",
        default_value_t = DEFAULT_MAX_MEMORY_PERCENT,
        env = "RAPIDSHOW_MAX_MEMORY"
    )]
    pub max_memory_percent: f64,

    /// Minimum buffered slide count before displaying begins.
    #[arg(
        short = 'b',
        long = "buffer",
        default_value_t = DEFAULT_MINIMUM_PRIMED_LENGTH,
        env = "RAPIDSHOW_BUFFER"
    )]
    pub minimum_buffer_length: usize,

    /// Keep at most this many slides instead of limiting by memory.
    #[arg(long, env = "RAPIDSHOW_MAX_SLIDES")]
    pub max_slides: Option<usize>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Log fps, memory and buffer statistics every second.
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub source: SourceCommand,
}

/// Where slides come from.
#[derive(Subcommand, Debug, Clone)]
pub enum SourceCommand {
    /// Read images from local directories, files or glob patterns.
    Dir(DirConfig),

    /// Stream images from a tag search on a remote catalog.
    Gel(CatalogConfig),
}

/// Arguments for the `dir` subcommand.
#[derive(Args, Debug, Clone)]
pub struct DirConfig {
    /// Directories, files or glob patterns (supports * ? [ ] wildcards).
    #[arg(required = true, value_name = "DIR")]
    pub patterns: Vec<String>,
}

/// Arguments for the `gel` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CatalogConfig {
    /// Tags to search for.
    #[arg(required = true, value_name = "TAG")]
    pub tags: Vec<String>,

    /// Download full resolution images instead of samples.
    #[arg(long, default_value_t = false)]
    pub hq: bool,

    /// Catalog endpoint URL.
    #[arg(long, default_value = DEFAULT_CATALOG_ENDPOINT, env = "RAPIDSHOW_ENDPOINT")]
    pub endpoint: String,

    /// Timeout for each catalog query or download, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "RAPIDSHOW_TIMEOUT")]
    pub timeout: u64,
}

impl CatalogConfig {
    pub fn resolution(&self) -> Resolution {
        if self.hq {
            Resolution::Full
        } else {
            Resolution::Sampled
        }
    }

    pub fn query(&self) -> CatalogQuery {
        CatalogQuery::new(self.tags.clone(), self.resolution())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Cli {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.fps == 0 {
            return Err("fps must be greater than 0".to_string());
        }

        if self.width == 0 || self.height == 0 {
            return Err("display width and height must be greater than 0".to_string());
        }

        if !(self.max_memory_percent > 0.0 && self.max_memory_percent <= 100.0) {
            return Err("mem must be a percentage in (0, 100]".to_string());
        }

        if self.minimum_buffer_length == 0 {
            return Err("buffer must be greater than 0".to_string());
        }

        if self.max_slides == Some(0) {
            return Err("max_slides must be greater than 0".to_string());
        }

        match &self.source {
            SourceCommand::Dir(dir) => {
                if dir.patterns.iter().all(|p| p.trim().is_empty()) {
                    return Err("at least one directory or pattern is required".to_string());
                }
            }
            SourceCommand::Gel(gel) => {
                if gel.tags.iter().all(|t| t.trim().is_empty()) {
                    return Err("at least one tag is required".to_string());
                }
                if gel.timeout == 0 {
                    return Err("timeout must be greater than 0".to_string());
                }
            }
        }

        Ok(())
    }

    /// Buffer configuration: a count bound when `--max-slides` is given,
    /// otherwise the memory ceiling.
    pub fn buffer_config(&self) -> BufferConfig {
        match self.max_slides {
            Some(max_length) => BufferConfig::count_bound(max_length, self.minimum_buffer_length),
            None => BufferConfig::memory_bound(
                self.max_memory_percent / 100.0,
                self.minimum_buffer_length,
            ),
        }
    }

    pub fn display(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Time between two displayed frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}

// =============================================================================
// Tests
// =============================================================================
