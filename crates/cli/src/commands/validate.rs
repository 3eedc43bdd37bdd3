//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::CaptureConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    output_dir: String,
    device_id: String,
    debug: bool,
    channels: Vec<String>,
    sampling_period_us: u32,
    video_frequency: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    output_dir: config.session.output_dir.display().to_string(),
                    device_id: config.device.device_id.clone(),
                    debug: config.session.debug,
                    channels: config
                        .imu
                        .channels
                        .iter()
                        .map(|c| c.id().to_string())
                        .collect(),
                    sampling_period_us: config.imu.sampling_period_us,
                    video_frequency: config.video.frequency,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Non-fatal issues
fn collect_warnings(config: &CaptureConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.session.debug {
        warnings.push(
            "session.debug is on - ASCII IMU mirrors and text depth dumps will be written"
                .to_string(),
        );
    }
    if config.imu.uncalibrated_accel {
        warnings.push(
            "imu.uncalibrated_accel is on - raw accelerometer values are recorded as acce"
                .to_string(),
        );
    }
    if config.device.name.is_empty() {
        warnings.push("device.name is empty - metadata device name will be blank".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Output dir: {}", summary.output_dir);
            println!("  Device id: {}", summary.device_id);
            println!("  IMU channels: {}", summary.channels.join(", "));
            println!("  IMU sampling period: {} us", summary.sampling_period_us);
            println!("  Video frequency: {} Hz", summary.video_frequency);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
