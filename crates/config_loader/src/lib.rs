//! # Config Loader
//!
//! Capture configuration loading.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate field ranges and cross-field rules
//! - Produce a `CaptureConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("capture.toml")).unwrap();
//! println!("Output: {}", config.session.output_dir.display());
//! ```

mod parser;
mod rules;

pub use contracts::CaptureConfig;
pub use parser::ConfigFormat;

use contracts::CaptureError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<CaptureConfig, CaptureError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<CaptureConfig, CaptureError> {
        let config = parser::parse(content, format)?;
        rules::validate(&config)?;
        Ok(config)
    }

    /// Validate an already built configuration (e.g. after CLI overrides)
    pub fn validate(config: &CaptureConfig) -> Result<(), CaptureError> {
        rules::validate(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(config: &CaptureConfig) -> Result<String, CaptureError> {
        toml::to_string_pretty(config)
            .map_err(|e| CaptureError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize to JSON string
    pub fn to_json(config: &CaptureConfig) -> Result<String, CaptureError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| CaptureError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, CaptureError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            CaptureError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            CaptureError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}
