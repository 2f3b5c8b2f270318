use crate::error::{Result, SigrelayError};
use crate::signal::{forwardable, parse_signal, SigNum};
use nix::sys::signal::SaFlags;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for which signals get forwarded and how the handler is installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardConfig {
    /// Signals kept by the supervisor instead of being forwarded
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Restart system calls interrupted by a forwarded signal (SA_RESTART)
    #[serde(default = "default_restart_interrupted")]
    pub restart_interrupted: bool,
}

// Default value functions for serde
fn default_exclude() -> Vec<String> {
    vec!["SIGPIPE".to_string()]
}

fn default_restart_interrupted() -> bool {
    true
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            restart_interrupted: default_restart_interrupted(),
        }
    }
}

impl ForwardConfig {
    /// Load the configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<ForwardConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SigrelayError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(SigrelayError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML configuration, either top-level or under a `[forward]` table
    fn parse_toml(contents: &str) -> Result<ForwardConfig> {
        #[derive(Deserialize)]
        struct ConfigFile {
            forward: Option<ForwardConfig>,
            #[serde(flatten)]
            inline: ForwardConfig,
        }

        let config_file: ConfigFile = toml::from_str(contents)
            .map_err(|e| SigrelayError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;

        Ok(config_file.forward.unwrap_or(config_file.inline))
    }

    /// Parse JSON configuration
    fn parse_json(contents: &str) -> Result<ForwardConfig> {
        serde_json::from_str(contents)
            .map_err(|e| SigrelayError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let excluded = self.excluded_signals().map_err(|e| {
            SigrelayError::ConfigValidationError(format!("Invalid exclude entry: {}", e))
        })?;

        if forwardable(&excluded).is_empty() {
            return Err(SigrelayError::ConfigValidationError(
                "exclude leaves no signal to forward".to_string(),
            ));
        }

        Ok(())
    }

    /// Add a signal to the exclusion list, skipping duplicates
    pub fn exclude_signal(&mut self, name: &str) -> Result<()> {
        let signal = parse_signal(name)?;
        if !self.excluded_signals()?.contains(&signal) {
            self.exclude.push(signal.to_string());
        }
        Ok(())
    }

    /// Parsed form of `exclude`
    pub fn excluded_signals(&self) -> Result<Vec<SigNum>> {
        self.exclude.iter().map(|name| parse_signal(name)).collect()
    }

    /// The signals a forwarder built from this configuration intercepts
    pub fn signals(&self) -> Result<Vec<SigNum>> {
        Ok(forwardable(&self.excluded_signals()?))
    }

    /// Flags for the installed forwarding handler
    pub fn sa_flags(&self) -> SaFlags {
        if self.restart_interrupted {
            SaFlags::SA_RESTART
        } else {
            SaFlags::empty()
        }
    }
}
