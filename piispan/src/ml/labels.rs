//! Class label handling for token-classification checkpoints.

use super::error::{MLError, Result};
use serde_json::Value;

/// Ordered class labels; the index of a label is its class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Build a map from labels already in class-id order.
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(MLError::configuration("Label map is empty"));
        }
        Ok(Self { labels })
    }

    /// Read the `id2label` object of a checkpoint's `config.json`.
    ///
    /// Ids must be contiguous from `0`.
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let id2label = config
            .get("id2label")
            .and_then(|v| v.as_object())
            .ok_or_else(|| MLError::configuration("config.json is missing an id2label mapping"))?;

        let mut entries = Vec::with_capacity(id2label.len());
        for (key, value) in id2label {
            let id: usize = key
                .parse()
                .map_err(|_| MLError::configuration(format!("Non-numeric id2label key '{}'", key)))?;
            let label = value.as_str().ok_or_else(|| {
                MLError::configuration(format!("id2label entry {} is not a string", id))
            })?;
            entries.push((id, label.to_string()));
        }
        entries.sort_by_key(|(id, _)| *id);

        if let Some(gap) = entries.iter().enumerate().find(|(pos, (id, _))| pos != id) {
            return Err(MLError::configuration(format!(
                "id2label ids are not contiguous: expected {}, found {}",
                gap.0, (gap.1).0
            )));
        }

        Self::new(entries.into_iter().map(|(_, label)| label).collect())
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a class id.
    pub fn get(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Labels in class-id order.
    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    /// Sorted, de-duplicated labels as exposed to clients.
    pub fn sorted_unique(&self) -> Vec<String> {
        sorted_unique(self.labels.iter().cloned())
    }
}

/// Sort and de-duplicate a label list.
pub fn sorted_unique(labels: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut labels: Vec<String> = labels.into_iter().collect();
    labels.sort();
    labels.dedup();
    labels
}

/// Position of a token inside an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioPrefix {
    Begin,
    Inside,
}

/// Split a label into its BIO prefix and entity tag.
///
/// Labels without a `B-`/`I-` prefix count as inside tokens of an entity
/// named after the whole label, so `O` stays `O`.
pub fn split_tag(label: &str) -> (BioPrefix, &str) {
    if let Some(tag) = label.strip_prefix("B-") {
        (BioPrefix::Begin, tag)
    } else if let Some(tag) = label.strip_prefix("I-") {
        (BioPrefix::Inside, tag)
    } else {
        (BioPrefix::Inside, label)
    }
}
