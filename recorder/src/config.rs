//! Recorder configuration.
//!
//! Configuration is stored in ~/.blerec/config.yaml. Every field has a
//! default, so an empty or missing file is valid.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use blerec_reassembly::ResyncPolicy;
use serde::{Deserialize, Serialize};

use crate::batch::FrameBatcher;
use crate::error::RecorderError;
use crate::profile::{DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".blerec";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Frames per batch handed to the sink.
pub const DEFAULT_BATCH_THRESHOLD: usize = 10;
/// Duration of one encoded frame.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 20;
/// Batches buffered between a session and an asynchronous sink.
pub const DEFAULT_PIPELINE_CAPACITY: usize = 16;

/// Highest accepted sample rate.
pub const MAX_SAMPLE_RATE: u32 = 384_000;
/// Highest accepted channel count; OpusHead stores it in one byte.
pub const MAX_CHANNELS: u16 = 255;

/// How recorded frames are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Encoded frames, unchanged, in an Ogg Opus container.
    #[default]
    Ogg,
    /// Frames decoded to 16-bit PCM in a WAVE file.
    Wav,
    /// Length-prefixed raw frames.
    Frames,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Ogg => "ogg",
            Self::Wav => "wav",
            Self::Frames => "frames",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ogg" | "opus" => Ok(Self::Ogg),
            "wav" => Ok(Self::Wav),
            "frames" | "raw" => Ok(Self::Frames),
            other => Err(RecorderError::invalid_config(format!(
                "unknown output format '{}'",
                other
            ))),
        }
    }
}

/// Settings of a recording session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Frames collected before a batch is handed to the sink.
    pub batch_threshold: usize,

    /// Handling of the packet that reveals a loss.
    pub resync: ResyncPolicy,

    /// Emit the last, unterminated frame when the session ends.
    pub flush_partial_frame: bool,

    /// Sample rate of the decoded audio.
    pub sample_rate: u32,

    /// Channel count of the decoded audio.
    pub channels: u16,

    /// Duration of one encoded frame, used for Ogg granule positions.
    pub frame_duration_ms: u32,

    /// Storage format.
    pub format: OutputFormat,

    /// Directory for recordings (optional, current directory if unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Bounded queue length in front of an asynchronous sink.
    pub pipeline_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            resync: ResyncPolicy::default(),
            flush_partial_frame: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
            format: OutputFormat::default(),
            output_dir: None,
            pipeline_capacity: DEFAULT_PIPELINE_CAPACITY,
        }
    }
}

impl RecorderConfig {
    /// Gets the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, RecorderError> {
        // An empty document deserializes to unit, not to a map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serializes the configuration to YAML.
    pub fn to_yaml(&self) -> Result<String, RecorderError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, RecorderError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads `custom_path` if given, else the default file if it exists,
    /// else the defaults.
    pub fn load_or_default(custom_path: Option<&Path>) -> Result<Self, RecorderError> {
        if let Some(path) = custom_path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Saves the configuration, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), RecorderError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Checks that every field is usable.
    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.batch_threshold == 0 {
            return Err(RecorderError::invalid_config("batch_threshold must be positive"));
        }
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(RecorderError::invalid_config(format!(
                "sample_rate must be in 1..={}",
                MAX_SAMPLE_RATE
            )));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(RecorderError::invalid_config(format!(
                "channels must be in 1..={}",
                MAX_CHANNELS
            )));
        }
        if self.frame_duration_ms == 0 {
            return Err(RecorderError::invalid_config("frame_duration_ms must be positive"));
        }
        if self.pipeline_capacity == 0 {
            return Err(RecorderError::invalid_config("pipeline_capacity must be positive"));
        }
        Ok(())
    }

    /// Returns the batch threshold, or the default if it is zero.
    pub fn batch_threshold(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.batch_threshold).unwrap_or(FrameBatcher::DEFAULT_THRESHOLD)
    }

    /// Returns the frame duration in samples at 48 kHz, the Ogg Opus
    /// granule clock.
    pub fn frame_duration_48k(&self) -> u64 {
        u64::from(self.frame_duration_ms) * 48
    }

    /// Returns the path of a new recording named after `stem`.
    pub fn recording_path(&self, stem: &str) -> PathBuf {
        let name = format!("{}.{}", stem, self.format.extension());
        match &self.output_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}
