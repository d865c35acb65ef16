//! Run configuration
//!
//! Built once at startup and handed to the pipeline by value. Two parts:
//!
//! - [`EndpointsConfig`]: the two store endpoints, read from a YAML file
//! - [`RangeConfig`]: the `[start, end)` range and window step, parsed from
//!   raw strings so malformed numbers surface as [`ConfigError`]s

use crate::errors::ConfigError;
use ndiff_core_types::Sensitive;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Start boundaries below this floor are clamped up to it.
pub const DEFAULT_START_HEIGHT: u64 = 21_000;

/// Window size used when no step is given.
pub const DEFAULT_STEP: u64 = 100;

/// Output directory used when none is given.
pub const DEFAULT_OUTPUT_DIR: &str = "diff_result";

/// Connection settings for one analytical store
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// `host:port` or full URL of the store's HTTP interface
    pub address: String,
    /// Logical database name
    pub database: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<Sensitive<String>>,
}

/// Both store endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    pub old: EndpointConfig,
    pub new: EndpointConfig,
}

impl EndpointsConfig {
    /// Load the endpoint file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::EndpointFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::EndpointFile { reason, .. } => ConfigError::EndpointFile {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse endpoint YAML
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::EndpointFile {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Unvalidated range settings as they arrive from flags or environment
#[derive(Debug, Clone, Default)]
pub struct RawRange {
    pub start: Option<String>,
    pub end: Option<String>,
    pub step: Option<String>,
}

/// A validated `[start, end)` range walked in `step`-sized windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeConfig {
    start: u64,
    end: u64,
    step: u64,
}

impl RangeConfig {
    /// Validate an explicit range without applying the start floor.
    ///
    /// # Errors
    ///
    /// `ZeroStep` if `step == 0`, `EmptyRange` if `end <= start`.
    pub fn new(start: u64, end: u64, step: u64) -> Result<Self, ConfigError> {
        if step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if end <= start {
            return Err(ConfigError::EmptyRange { start, end });
        }
        Ok(Self { start, end, step })
    }

    /// Parse and validate raw settings.
    ///
    /// `end` is required. `start` defaults to, and is clamped up to,
    /// [`DEFAULT_START_HEIGHT`]. `step` defaults to [`DEFAULT_STEP`].
    /// Blank values count as unset.
    pub fn from_raw(raw: &RawRange) -> Result<Self, ConfigError> {
        let end = match non_blank(raw.end.as_deref()) {
            Some(value) => parse_u64("END_HEIGHT", value)?,
            None => return Err(ConfigError::MissingField { field: "END_HEIGHT" }),
        };
        let start = match non_blank(raw.start.as_deref()) {
            Some(value) => parse_u64("START_HEIGHT", value)?,
            None => DEFAULT_START_HEIGHT,
        };
        let step = match non_blank(raw.step.as_deref()) {
            Some(value) => parse_u64("STEP", value)?,
            None => DEFAULT_STEP,
        };

        Self::new(start.max(DEFAULT_START_HEIGHT), end, step)
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Window start boundaries in ascending order
    pub fn boundaries(&self) -> Boundaries {
        Boundaries {
            next: Some(self.start),
            end: self.end,
            step: self.step,
        }
    }

    /// Number of windows the range splits into
    pub fn window_count(&self) -> u64 {
        (self.end - self.start).div_ceil(self.step)
    }

    /// Exclusive upper bound of the window starting at `boundary`
    pub fn window_end(&self, boundary: u64) -> u64 {
        boundary.saturating_add(self.step)
    }

    /// Highest position covered by the window starting at `boundary`
    pub fn progress_marker(&self, boundary: u64) -> u64 {
        self.window_end(boundary) - 1
    }
}

/// Iterator over window start boundaries of a [`RangeConfig`]
#[derive(Debug, Clone)]
pub struct Boundaries {
    next: Option<u64>,
    end: u64,
    step: u64,
}

impl Iterator for Boundaries {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let current = self.next.filter(|b| *b < self.end)?;
        self.next = current.checked_add(self.step);
        Some(current)
    }
}

/// Everything a run needs, assembled once at startup
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub endpoints: EndpointsConfig,
    pub range: RangeConfig,
    pub output_dir: PathBuf,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
