//! Encoder plus linear classification head, run with candle

use candle_core::{D, DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tracing::debug;

use super::checkpoint::{CheckpointConfig, ModelFiles};
use super::error::{MLError, Result};
use super::tokenizer::TokenizedText;

/// Encoder families a checkpoint may declare through `model_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    Bert,
    XlmRoberta,
}

impl Architecture {
    pub fn from_model_type(model_type: &str) -> Result<Self> {
        match model_type.to_lowercase().as_str() {
            "bert" => Ok(Architecture::Bert),
            "xlm-roberta" | "roberta" => Ok(Architecture::XlmRoberta),
            other => Err(MLError::configuration(format!(
                "Unsupported model_type '{}'; expected bert, roberta or xlm-roberta",
                other
            ))),
        }
    }

    /// Weight prefix used by token-classification checkpoints.
    fn weight_prefix(self) -> &'static str {
        match self {
            Architecture::Bert => "bert",
            Architecture::XlmRoberta => "roberta",
        }
    }
}

enum Encoder {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

/// Token classifier producing a probability distribution over labels per token.
pub struct TokenClassifier {
    encoder: Encoder,
    classifier: Linear,
    architecture: Architecture,
    device: Device,
    num_labels: usize,
}

impl TokenClassifier {
    /// Load encoder and `classifier.*` weights from a checkpoint.
    pub fn load(files: &ModelFiles, config: &CheckpointConfig, device: &Device) -> Result<Self> {
        let architecture = Architecture::from_model_type(&config.model_type)?;
        let num_labels = config.labels.len();
        let hidden_size = config
            .hidden_size
            .ok_or_else(|| MLError::configuration("config.json is missing hidden_size"))?;

        // SAFETY: the weights file is memory-mapped and must not change while loaded.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&files.weights_path], DType::F32, device)
                .map_err(|e| MLError::model_loading(format!("Failed to map weights: {}", e)))?
        };

        // Bare encoder checkpoints have no prefix
        let prefix = architecture.weight_prefix();
        let embeddings = format!("{}.embeddings.word_embeddings.weight", prefix);
        let encoder_vb = if vb.contains_tensor(&embeddings) {
            vb.pp(prefix)
        } else {
            vb.clone()
        };

        let encoder = match architecture {
            Architecture::Bert => {
                let cfg: BertConfig = serde_json::from_str(&config.raw)
                    .map_err(|e| MLError::configuration(format!("Invalid BERT config: {}", e)))?;
                let model = BertModel::load(encoder_vb, &cfg).map_err(|e| {
                    MLError::model_loading(format!("Failed to build BERT encoder: {}", e))
                })?;
                Encoder::Bert(model)
            }
            Architecture::XlmRoberta => {
                let cfg: XLMRobertaConfig = serde_json::from_str(&config.raw).map_err(|e| {
                    MLError::configuration(format!("Invalid XLM-RoBERTa config: {}", e))
                })?;
                let model = XLMRobertaModel::new(&cfg, encoder_vb).map_err(|e| {
                    MLError::model_loading(format!("Failed to build XLM-RoBERTa encoder: {}", e))
                })?;
                Encoder::XlmRoberta(model)
            }
        };

        let classifier = candle_nn::linear(hidden_size, num_labels, vb.pp("classifier"))
            .map_err(|e| MLError::model_loading(format!("Failed to load classifier head: {}", e)))?;

        debug!(?architecture, hidden_size, num_labels, "Token classifier loaded");

        Ok(Self {
            encoder,
            classifier,
            architecture,
            device: device.clone(),
            num_labels,
        })
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Softmax probabilities, shaped `[tokens][labels]`.
    pub fn probabilities(&self, encoded: &TokenizedText) -> Result<Vec<Vec<f32>>> {
        if encoded.is_empty() {
            return Ok(Vec::new());
        }

        let input_ids = Tensor::new(encoded.ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(encoded.type_ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(encoded.attention_mask.as_slice(), &self.device)?.unsqueeze(0)?;

        // [1, seq_len, hidden_size]
        let hidden = match &self.encoder {
            Encoder::Bert(model) => model.forward(&input_ids, &type_ids, Some(&attention_mask))?,
            Encoder::XlmRoberta(model) => {
                model.forward(&input_ids, &attention_mask, &type_ids, None, None, None)?
            }
        };

        let logits = self.classifier.forward(&hidden)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?;
        let probs = probs.squeeze(0)?.to_vec2::<f32>()?;

        if probs.first().is_some_and(|row| row.len() != self.num_labels) {
            return Err(MLError::inference(format!(
                "Classifier produced {} scores per token, expected {}",
                probs[0].len(),
                self.num_labels
            )));
        }

        Ok(probs)
    }
}
