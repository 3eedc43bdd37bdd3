//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Scan Capture - record depth, confidence, camera poses and IMU into a session bundle
#[derive(Parser, Debug)]
#[command(
    name = "scan-capture",
    author,
    version,
    about = "Multi-modal scan capture",
    long_about = "Records synchronized depth, confidence, per-frame camera info and IMU \n\
                  streams into a session folder, reconciles the frame count against the \n\
                  video container and writes the session metadata."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SCAN_CAPTURE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SCAN_CAPTURE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a session from the synthetic sources
    Record(RecordArgs),

    /// Validate configuration file without recording
    Validate(ValidateArgs),

    /// Read back a finished session folder
    Inspect(InspectArgs),
}

/// Arguments for the `record` command
#[derive(Parser, Debug, Clone)]
pub struct RecordArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "SCAN_CAPTURE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long, env = "SCAN_CAPTURE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Override the device id used in the folder name
    #[arg(long, env = "SCAN_CAPTURE_DEVICE_ID")]
    pub device_id: Option<String>,

    /// Also write the ASCII IMU mirrors and depth/confidence text dumps
    #[arg(long)]
    pub debug: bool,

    /// Scene type written to the metadata
    #[arg(long, default_value = "unspecified")]
    pub scene_type: String,

    /// Scene description written to the metadata
    #[arg(long, default_value = "")]
    pub description: String,

    /// Number of camera frames to render (0 = until Ctrl+C)
    #[arg(long, default_value = "120")]
    pub frames: u64,

    /// Camera frame rate
    #[arg(long, default_value = "30")]
    pub fps: u32,

    /// Depth image width
    #[arg(long, default_value = "160")]
    pub depth_width: u32,

    /// Depth image height
    #[arg(long, default_value = "90")]
    pub depth_height: u32,

    /// Frames whose depth image is unavailable (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub drop_depth: Vec<u64>,

    /// Rate of each synthetic IMU sensor (Hz)
    #[arg(long, default_value = "200")]
    pub imu_hz: f64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SCAN_CAPTURE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "capture.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `inspect` command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Session folder
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
