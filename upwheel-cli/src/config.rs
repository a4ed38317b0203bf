use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::io::read_document;

/// Output settings read from `--config`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Prepended to each target document's file name on output.
    pub output_prefix: String,
    pub summary_file_name: String,
    pub results_file_name: String,
    /// Head upgraded documents and the summary with the tool version.
    pub version_header: bool,
    /// When false, refuse to replace files that already exist.
    pub overwrite: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_prefix: "upgraded-".to_string(),
            summary_file_name: "upwheelSummary.yaml".to_string(),
            results_file_name: "upwheelResults.json".to_string(),
            version_header: true,
            overwrite: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be a bare file name, got '{value}'")]
    NotAFileName { field: &'static str, value: String },
    #[error("summary and results would both be written to '{0}'")]
    SameOutputFile(String),
}

fn check_file_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Empty { field });
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ConfigError::NotAFileName {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl CliConfig {
    /// Load from `path`, or defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => read_document::<Self>(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // An empty prefix would write upgraded documents over their inputs.
        check_file_name("output_prefix", &self.output_prefix)?;
        check_file_name("summary_file_name", &self.summary_file_name)?;
        check_file_name("results_file_name", &self.results_file_name)?;
        if self.summary_file_name == self.results_file_name {
            return Err(ConfigError::SameOutputFile(self.summary_file_name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CliConfig::default();
        assert_eq!(config.output_prefix, "upgraded-");
        assert!(config.version_header);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: CliConfig =
            serde_json::from_str(r#"{"overwrite": false, "output_prefix": "spun-"}"#).unwrap();
        assert!(!config.overwrite);
        assert_eq!(config.output_prefix, "spun-");
        assert_eq!(config.summary_file_name, "upwheelSummary.yaml");
    }

    #[test]
    fn rejects_unusable_names() {
        let empty = CliConfig {
            output_prefix: String::new(),
            ..CliConfig::default()
        };
        assert_eq!(
            empty.validate(),
            Err(ConfigError::Empty {
                field: "output_prefix"
            })
        );

        let nested = CliConfig {
            summary_file_name: "out/summary.yaml".to_string(),
            ..CliConfig::default()
        };
        assert!(matches!(
            nested.validate(),
            Err(ConfigError::NotAFileName { .. })
        ));

        let clash = CliConfig {
            results_file_name: "same".to_string(),
            summary_file_name: "same".to_string(),
            ..CliConfig::default()
        };
        assert_eq!(
            clash.validate(),
            Err(ConfigError::SameOutputFile("same".to_string()))
        );
    }
}
