use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::error::{Result, TrialError};

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// Skip the header and append, whatever the existing file contains.
    #[default]
    Append,
    /// Append only if the existing first line equals the session header.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_name: String,
    /// Add `_P{participant:03}` to the file name.
    pub include_participant: bool,
    /// Add `_{yyyyMMdd_HHmmss}` to the file name.
    pub include_timestamp: bool,
    pub header_policy: HeaderPolicy,
    /// Explicit output directory; the platform data directory when unset.
    pub directory: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_name: "TrialResults".to_string(),
            include_participant: true,
            include_timestamp: true,
            header_policy: HeaderPolicy::Append,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub participant_column: String,
    pub trial_column: String,
    /// Read by the presentation layer to pick the stimulus to show.
    pub stimulus_column: String,
    pub output: OutputConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            participant_column: "ParticipantID".to_string(),
            trial_column: "TrialNumber".to_string(),
            stimulus_column: "StimulusID".to_string(),
            output: OutputConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load from `.yaml`/`.yml` or, for any other extension, JSON.
    /// Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TrialError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let parsed: std::result::Result<Self, String> = if is_yaml {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        };
        let config = parsed.map_err(|reason| TrialError::Config {
            path: path.to_path_buf(),
            reason,
        })?;

        info!(path = %path.display(), "loaded session config");
        Ok(config)
    }
}

/// A (participant, trial) choice to start or resume from. Passed in
/// explicitly; the library never looks it up by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub participant: i64,
    pub trial: i64,
}

impl Selection {
    pub fn new(participant: i64, trial: i64) -> Self {
        Self { participant, trial }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn yaml_overrides_merge_with_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.yaml");
        fs::write(
            &path,
            "trial_column: Trial\noutput:\n  base_name: Pilot\n  include_timestamp: false\n  header_policy: strict\n",
        )?;

        let config = SessionConfig::load(&path)?;
        assert_eq!(config.participant_column, "ParticipantID");
        assert_eq!(config.trial_column, "Trial");
        assert_eq!(config.output.base_name, "Pilot");
        assert!(config.output.include_participant);
        assert!(!config.output.include_timestamp);
        assert_eq!(config.output.header_policy, HeaderPolicy::Strict);
        Ok(())
    }

    #[test]
    fn json_config() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"stimulus_column": "Image"}"#)?;

        let config = SessionConfig::load(&path)?;
        assert_eq!(config.stimulus_column, "Image");
        assert_eq!(config.output, OutputConfig::default());
        Ok(())
    }

    #[test]
    fn bad_config_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        match SessionConfig::load(&path) {
            Err(TrialError::Config { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            SessionConfig::load(dir.path().join("missing.yaml")),
            Err(TrialError::Io { .. })
        ));
    }
}
