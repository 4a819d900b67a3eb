//! Recording on top of packet reassembly.
//!
//! A [`RecordingSession`] takes raw notifications from the audio data
//! characteristic, reassembles them into frames, groups the frames into
//! batches of [`RecorderConfig::batch_threshold`] and hands the batches to a
//! [`FrameSink`].
//!
//! # Sinks
//!
//! - [`OggOpusSink`]: encoded frames in an Ogg Opus file
//! - [`DecodingSink`]: frames decoded by a [`FrameDecoder`] into a WAVE file
//! - [`FrameFileSink`]: length-prefixed raw frames
//! - [`MemorySink`]: everything kept in memory
//!
//! A sink can be moved off the receiving thread with [`spawn_sink`], which
//! keeps batch order through a single-producer single-consumer queue.

mod batch;
mod capture;
mod codec;
mod config;
mod error;
mod ogg;
mod pipeline;
mod profile;
mod session;
mod sink;
mod wav;

pub use batch::{FrameBatch, FrameBatcher};
pub use capture::{read_capture, write_capture};
pub use codec::{FrameDecoder, Pcm16Decoder};
pub use config::{
    DEFAULT_BATCH_THRESHOLD, DEFAULT_FRAME_DURATION_MS, DEFAULT_PIPELINE_CAPACITY, MAX_CHANNELS,
    MAX_SAMPLE_RATE, OutputFormat, RecorderConfig,
};
pub use error::RecorderError;
pub use ogg::{MAX_PAGE_PAYLOAD, OggOpusWriter};
pub use pipeline::{BatchSender, SinkHandle, spawn_sink};
pub use profile::{
    AUDIO_CODEC_CHARACTERISTIC_UUID, AUDIO_DATA_CHARACTERISTIC_UUID, AUDIO_SERVICE_UUID,
    DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, DeviceProfile, RECORDING_PREFIX,
};
pub use session::{RecordingSession, SessionSummary};
pub use sink::{DecodingSink, FrameFileSink, FrameSink, MemorySink, OggOpusSink, read_frames};
pub use wav::WavWriter;
