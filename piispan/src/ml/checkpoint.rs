//! Local checkpoint directories.

use super::error::{MLError, Result};
use super::labels::LabelMap;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Paths to the files a checkpoint must provide.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub dir: PathBuf,
    pub config_path: PathBuf,
    pub weights_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

impl ModelFiles {
    /// Locate the checkpoint files inside `dir`, failing if any is missing.
    pub fn locate(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(MLError::model_loading(format!(
                "Model directory not found: {}",
                dir.display()
            )));
        }

        let files = Self {
            dir: dir.to_path_buf(),
            config_path: dir.join(CONFIG_FILE),
            weights_path: dir.join(WEIGHTS_FILE),
            tokenizer_path: dir.join(TOKENIZER_FILE),
        };

        for path in [&files.config_path, &files.weights_path, &files.tokenizer_path] {
            if !path.is_file() {
                return Err(MLError::model_loading(format!(
                    "Checkpoint file missing: {}",
                    path.display()
                )));
            }
        }

        Ok(files)
    }

    /// Read and parse `config.json`.
    pub fn read_config(&self) -> Result<CheckpointConfig> {
        let raw = std::fs::read_to_string(&self.config_path)?;
        CheckpointConfig::parse(&raw)
    }
}

/// The architecture-independent parts of `config.json`.
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
    /// Original file contents, re-parsed by the architecture-specific loader
    pub raw: String,
    pub model_type: String,
    pub labels: LabelMap,
    pub hidden_size: Option<usize>,
    pub max_position_embeddings: Option<usize>,
}

impl CheckpointConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| MLError::model_loading(format!("Invalid config.json: {}", e)))?;

        let model_type = value
            .get("model_type")
            .and_then(Value::as_str)
            .ok_or_else(|| MLError::configuration("config.json is missing model_type"))?
            .to_string();

        let labels = LabelMap::from_config_json(&value)?;
        let read_usize = |key: &str| value.get(key).and_then(Value::as_u64).map(|n| n as usize);
        let hidden_size = read_usize("hidden_size");
        let max_position_embeddings = read_usize("max_position_embeddings");

        Ok(Self {
            raw: raw.to_string(),
            model_type,
            labels,
            hidden_size,
            max_position_embeddings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_missing_dir() {
        let err = ModelFiles::locate("/no/such/checkpoint").unwrap_err();
        assert!(matches!(err, MLError::ModelLoading(_)));
        assert!(err.to_string().contains("/no/such/checkpoint"));
    }

    #[test]
    fn test_locate_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
        std::fs::write(dir.path().join(TOKENIZER_FILE), "{}").unwrap();

        let err = ModelFiles::locate(dir.path()).unwrap_err();
        assert!(err.to_string().contains(WEIGHTS_FILE));
    }

    #[test]
    fn test_parse_config() {
        let config = CheckpointConfig::parse(
            r#"{
                "model_type": "xlm-roberta",
                "hidden_size": 1024,
                "max_position_embeddings": 514,
                "id2label": {"0": "O", "1": "B-EMAIL", "2": "I-EMAIL"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.model_type, "xlm-roberta");
        assert_eq!(config.hidden_size, Some(1024));
        assert_eq!(config.max_position_embeddings, Some(514));
        assert_eq!(config.labels.len(), 3);
    }

    #[test]
    fn test_parse_config_errors() {
        assert!(matches!(
            CheckpointConfig::parse("not json"),
            Err(MLError::ModelLoading(_))
        ));
        assert!(matches!(
            CheckpointConfig::parse(r#"{"id2label": {"0": "O"}}"#),
            Err(MLError::Configuration(_))
        ));
    }
}
