//! Pipeline backed by a local candle checkpoint.

use tracing::{debug, info, warn};

use super::aggregation::{AggregationStrategy, aggregate};
use super::{EntityGroup, TokenClassificationPipeline};
use crate::config::RuntimeConfig;
use crate::ml::{LabelMap, ModelFiles, PiiTokenizer, Result, TokenClassifier, resolve_device};

/// Hard cap on sequence length when the checkpoint does not state one.
pub const MAX_SEQ_LENGTH_CAP: usize = 512;

/// Tokenizer, classifier and aggregation loaded from one checkpoint directory.
pub struct CandlePipeline {
    tokenizer: PiiTokenizer,
    classifier: TokenClassifier,
    labels: LabelMap,
    strategy: AggregationStrategy,
    device_name: String,
}

impl CandlePipeline {
    /// Load the checkpoint named by `config.model_dir`.
    ///
    /// Fails on an unknown aggregation strategy before touching the checkpoint.
    pub fn load(config: &RuntimeConfig) -> Result<Self> {
        let strategy: AggregationStrategy = config.aggregation_strategy.parse()?;

        let files = ModelFiles::locate(&config.model_dir)?;
        let checkpoint = files.read_config()?;
        let (device, device_name) = resolve_device(config.device.as_deref())?;

        let max_length =
            resolve_max_length(config.max_seq_length, checkpoint.max_position_embeddings);
        if config.max_seq_length.is_some_and(|configured| {
            checkpoint
                .max_position_embeddings
                .is_some_and(|limit| configured > limit.saturating_sub(2))
        }) {
            warn!(
                max_seq_length = max_length,
                "Configured sequence length exceeds the model's position embeddings"
            );
        }

        let tokenizer = PiiTokenizer::from_file(&files.tokenizer_path, max_length)?;
        let classifier = TokenClassifier::load(&files, &checkpoint, &device)?;

        info!(
            model_dir = %files.dir.display(),
            architecture = ?classifier.architecture(),
            device = %device_name,
            %strategy,
            max_length,
            labels = checkpoint.labels.len(),
            "Token classification pipeline ready"
        );

        Ok(Self {
            tokenizer,
            classifier,
            labels: checkpoint.labels,
            strategy,
            device_name,
        })
    }
}

impl TokenClassificationPipeline for CandlePipeline {
    fn run(&self, text: &str) -> Result<Vec<EntityGroup>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let encoded = self.tokenizer.encode(text)?;
        let probs = self.classifier.probabilities(&encoded)?;
        let groups = aggregate(self.strategy, text, &encoded, &probs, &self.labels);

        debug!(
            tokens = encoded.len(),
            truncated = encoded.truncated,
            groups = groups.len(),
            "Classified text"
        );
        Ok(groups)
    }

    fn id2label(&self) -> Vec<String> {
        self.labels.as_slice().to_vec()
    }

    fn device(&self) -> String {
        self.device_name.clone()
    }
}

/// Explicit length wins; otherwise the model's position limit minus two, capped.
pub fn resolve_max_length(
    configured: Option<usize>,
    max_position_embeddings: Option<usize>,
) -> usize {
    if let Some(length) = configured {
        return length;
    }

    max_position_embeddings
        .map(|limit| limit.saturating_sub(2))
        .filter(|&limit| limit > 0)
        .map_or(MAX_SEQ_LENGTH_CAP, |limit| limit.min(MAX_SEQ_LENGTH_CAP))
}
