//! Utility functions for CLI commands.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use blerec_recorder::{RecorderConfig, read_capture};

use crate::Cli;

/// Loads the recorder configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<RecorderConfig> {
    Ok(RecorderConfig::load_or_default(cli.config.as_deref().map(Path::new))?)
}

/// Reads a capture file.
pub fn load_capture(path: &Path) -> anyhow::Result<Vec<Vec<u8>>> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("cannot open capture '{}': {}", path.display(), e))?;
    Ok(read_capture(BufReader::new(file))?)
}

/// Requires the output file to be provided.
pub fn require_output_file(cli: &Cli) -> anyhow::Result<&str> {
    cli.output
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("output file is required, use -o flag"))
}

/// Outputs result as JSON or YAML on stdout.
pub fn output_result<T: serde::Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };
    print!("{}", output);
    Ok(())
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {}", msg);
}

/// Formats bytes to human readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_load_capture_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_capture(&dir.path().join("none.txt")).unwrap_err();
        assert!(err.to_string().starts_with("cannot open capture"));
    }
}
