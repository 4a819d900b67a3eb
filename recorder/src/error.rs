//! Error types for the recorder.

use std::io;

use thiserror::Error;

/// Errors returned by the recording stages downstream of reassembly.
///
/// Packet loss is not an error here: it reaches sinks as a
/// [`LossEvent`](blerec_reassembly::LossEvent) and recording continues.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recorder: io: {0}")]
    Io(#[from] io::Error),

    #[error("recorder: config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("recorder: invalid config: {0}")]
    InvalidConfig(String),

    #[error("recorder: cannot decode frame of {len} bytes: {reason}")]
    Decode { len: usize, reason: &'static str },

    #[error("recorder: capture line {line}: {source}")]
    Capture {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    #[error("recorder: frame of {len} bytes exceeds the length prefix")]
    FrameTooLong { len: usize },

    #[error("recorder: sink closed")]
    SinkClosed,

    #[error("recorder: sink task failed: {0}")]
    TaskFailed(String),
}

impl RecorderError {
    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
