//! Replay of captures into recordings.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::info;

use blerec_reassembly::ResyncPolicy;
use blerec_recorder::{
    DecodingSink, FrameFileSink, FrameSink, OggOpusSink, OutputFormat, Pcm16Decoder,
    RECORDING_PREFIX, RecorderConfig, RecordingSession, SessionSummary, spawn_sink,
};

use super::{format_bytes, get_config, load_capture, output_result, print_success, print_warning};
use crate::Cli;

/// Storage format of the recording.
#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Encoded frames in an Ogg Opus file
    Ogg,
    /// Frames decoded as 16-bit PCM into a WAVE file
    Wav,
    /// Length-prefixed raw frames
    Frames,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Ogg => OutputFormat::Ogg,
            FormatArg::Wav => OutputFormat::Wav,
            FormatArg::Frames => OutputFormat::Frames,
        }
    }
}

/// Handling of the packet that reveals a loss.
#[derive(Clone, Copy, ValueEnum)]
enum ResyncArg {
    /// Discard it and wait for the next frame start
    Strict,
    /// Resynchronize on it if it starts a frame
    Immediate,
}

impl From<ResyncArg> for ResyncPolicy {
    fn from(arg: ResyncArg) -> Self {
        match arg {
            ResyncArg::Strict => ResyncPolicy::Strict,
            ResyncArg::Immediate => ResyncPolicy::Immediate,
        }
    }
}

/// Replays a capture through a recording session.
#[derive(Args)]
pub struct ReplayCommand {
    /// Capture file (hex, one notification per line)
    capture: PathBuf,

    /// Storage format (overrides config file)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Frames per batch (overrides config file)
    #[arg(long)]
    batch: Option<usize>,

    /// Resynchronization policy (overrides config file)
    #[arg(long, value_enum)]
    resync: Option<ResyncArg>,

    /// Drop the last frame instead of storing it unterminated
    #[arg(long)]
    no_flush_partial: bool,
}

#[derive(Serialize)]
struct ReplayReport {
    output: String,
    format: OutputFormat,
    #[serde(flatten)]
    summary: SessionSummary,
}

impl ReplayCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let config = self.config(cli)?;
        let packets = load_capture(&self.capture)?;
        let output = match &cli.output {
            Some(path) => PathBuf::from(path),
            None => config.recording_path(&recording_stem()),
        };

        info!(
            "replaying {} packets from {} into {}",
            packets.len(),
            self.capture.display(),
            output.display()
        );
        let sink = open_sink(&config, &output)?;
        let mut handle = spawn_sink(sink, config.pipeline_capacity);
        let sender = handle
            .sender()
            .ok_or_else(|| anyhow::anyhow!("sink sender already taken"))?;

        let session_config = config.clone();
        let session = tokio::task::spawn_blocking(move || {
            let mut session = RecordingSession::with_config(sender, &session_config);
            for packet in &packets {
                let _ = session.handle_notification(packet)?;
            }
            session.finish()
        });

        // A sink failure stops the session with a closed queue; the sink
        // error is the one worth reporting.
        let session_result = session.await?;
        handle.join().await?;
        let (_, summary) = session_result?;

        if summary.stats.losses() > 0 {
            print_warning(&format!(
                "{} losses, {} discarded",
                summary.stats.losses(),
                format_bytes(summary.stats.discarded_bytes)
            ));
        }
        print_success(&format!(
            "{} frames ({}) written to {}",
            summary.stats.frames,
            format_bytes(summary.stats.frame_bytes),
            output.display()
        ));

        let report = ReplayReport {
            output: output.display().to_string(),
            format: config.format,
            summary,
        };
        output_result(&report, cli.json)
    }

    fn config(&self, cli: &Cli) -> anyhow::Result<RecorderConfig> {
        let mut config = get_config(cli)?;
        if let Some(format) = self.format {
            config.format = format.into();
        }
        if let Some(batch) = self.batch {
            config.batch_threshold = batch;
        }
        if let Some(resync) = self.resync {
            config.resync = resync.into();
        }
        if self.no_flush_partial {
            config.flush_partial_frame = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn recording_stem() -> String {
    format!("{}{}", RECORDING_PREFIX, chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

fn open_sink(config: &RecorderConfig, path: &Path) -> anyhow::Result<Box<dyn FrameSink + Send>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = BufWriter::new(File::create(path)?);

    let sink: Box<dyn FrameSink + Send> = match config.format {
        OutputFormat::Ogg => Box::new(OggOpusSink::new(
            file,
            config.sample_rate,
            config.channels,
            config.frame_duration_48k(),
        )?),
        OutputFormat::Wav => Box::new(DecodingSink::new(
            Pcm16Decoder,
            file,
            config.sample_rate,
            config.channels,
        )?),
        OutputFormat::Frames => Box::new(FrameFileSink::new(file)),
    };
    Ok(sink)
}
