//! Integration tests against a real, tiny candle checkpoint
//!
//! A one-layer BERT with random weights and a hand-written WordPiece
//! tokenizer is written to a temporary directory and loaded through the same
//! path as a production checkpoint. Predictions are meaningless; offsets,
//! truncation and shapes are not.

use std::path::Path;

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use piispan::config::RuntimeConfig;
use piispan::ml::{ModelFiles, PiiTokenizer, TokenClassifier};
use piispan::pipeline::AggregationStrategy;
use piispan::runtime::PiiModel;
use serde_json::{Value, json};
use tempfile::TempDir;

const HIDDEN_SIZE: usize = 8;
const LABELS: [&str; 5] = ["O", "B-EMAIL", "I-EMAIL", "B-PHONE", "I-PHONE"];
const SAMPLE: &str = "메일 alice@example.com alice alice";

/// `[CLS] 메 ##일 alice @ [SEP]` covers the first 9 chars of `SAMPLE`
const TRUNCATED_LENGTH: usize = 6;
const TRUNCATED_CHARS: usize = 9;

fn config_json() -> Value {
    let id2label: serde_json::Map<String, Value> = LABELS
        .iter()
        .enumerate()
        .map(|(id, label)| (id.to_string(), json!(label)))
        .collect();

    json!({
        "model_type": "bert",
        "vocab_size": 16,
        "hidden_size": HIDDEN_SIZE,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "intermediate_size": 16,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.0,
        "attention_probs_dropout_prob": 0.0,
        "max_position_embeddings": 32,
        "type_vocab_size": 2,
        "initializer_range": 0.02,
        "layer_norm_eps": 1e-12,
        "pad_token_id": 0,
        "position_embedding_type": "absolute",
        "use_cache": false,
        "classifier_dropout": null,
        "id2label": id2label,
    })
}

fn tokenizer_json() -> Value {
    let special = |id: u32, content: &str| {
        json!({
            "id": id,
            "content": content,
            "single_word": false,
            "lstrip": false,
            "rstrip": false,
            "normalized": false,
            "special": true,
        })
    };

    json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            special(0, "[PAD]"),
            special(1, "[UNK]"),
            special(2, "[CLS]"),
            special(3, "[SEP]"),
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": false,
            "lowercase": true,
        },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 3],
            "cls": ["[CLS]", 2],
        },
        "decoder": null,
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": {
                "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3,
                "메": 4, "##일": 5, "alice": 6, "@": 7,
                "example": 8, ".": 9, "com": 10, "010": 11,
                "-": 12, "1234": 13, "5678": 14, "전화": 15,
            },
        },
    })
}

/// Write a checkpoint whose encoder weights live under `prefix`, or at the root.
fn write_checkpoint(dir: &Path, prefix: Option<&str>) {
    let config = config_json();
    std::fs::write(dir.join("config.json"), config.to_string()).unwrap();
    std::fs::write(dir.join("tokenizer.json"), tokenizer_json().to_string()).unwrap();

    let bert_config: BertConfig = serde_json::from_value(config).unwrap();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let encoder_vb = match prefix {
        Some(prefix) => vb.pp(prefix),
        None => vb.clone(),
    };
    BertModel::load(encoder_vb, &bert_config).unwrap();
    candle_nn::linear(HIDDEN_SIZE, LABELS.len(), vb.pp("classifier")).unwrap();
    varmap.save(dir.join("model.safetensors")).unwrap();
}

fn checkpoint(prefix: Option<&str>) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path(), prefix);
    dir
}

fn runtime_config(dir: &Path, strategy: AggregationStrategy) -> RuntimeConfig {
    RuntimeConfig {
        model_dir: dir.to_path_buf(),
        device: Some("cpu".to_string()),
        aggregation_strategy: strategy.to_string(),
        max_seq_length: Some(TRUNCATED_LENGTH),
        ..RuntimeConfig::default()
    }
}

#[test]
fn test_tokenizer_char_offsets_and_truncation() {
    let dir = checkpoint(Some("bert"));
    let path = dir.path().join("tokenizer.json");

    let tokenizer = PiiTokenizer::from_file(&path, TRUNCATED_LENGTH).unwrap();
    let encoded = tokenizer.encode(SAMPLE).unwrap();

    assert!(encoded.truncated);
    assert_eq!(encoded.len(), TRUNCATED_LENGTH);
    assert_eq!(encoded.ids, vec![2, 4, 5, 6, 7, 3]);
    assert!(encoded.is_special(0));
    assert!(encoded.is_special(TRUNCATED_LENGTH - 1));

    // Char offsets, not byte offsets
    assert_eq!(encoded.offsets[1], (0, 1));
    assert_eq!(encoded.offsets[2], (1, 2));
    assert_eq!(encoded.offsets[3], (3, 8));
    assert_eq!(encoded.offsets[4], (8, 9));

    // 메 and ##일 are one word
    assert_eq!(encoded.word_ids[1], encoded.word_ids[2]);
    assert_ne!(encoded.word_ids[2], encoded.word_ids[3]);

    let full = PiiTokenizer::from_file(&path, 64).unwrap().encode(SAMPLE).unwrap();
    assert!(!full.truncated);
    assert_eq!(full.ids.first(), Some(&2));
    assert_eq!(full.ids.last(), Some(&3));
}

#[test]
fn test_classifier_probabilities_shape() {
    let dir = checkpoint(Some("bert"));
    let files = ModelFiles::locate(dir.path()).unwrap();
    let config = files.read_config().unwrap();

    let classifier = TokenClassifier::load(&files, &config, &Device::Cpu).unwrap();
    let tokenizer = PiiTokenizer::from_file(&files.tokenizer_path, 64).unwrap();
    let encoded = tokenizer.encode(SAMPLE).unwrap();

    let probs = classifier.probabilities(&encoded).unwrap();
    assert_eq!(probs.len(), encoded.len());
    for row in &probs {
        assert_eq!(row.len(), LABELS.len());
        let total: f32 = row.iter().sum();
        assert!((total - 1.0).abs() < 1e-4, "row sums to {}", total);
    }
}

#[test]
fn test_spans_respect_offsets_under_every_strategy() {
    let dir = checkpoint(Some("bert"));
    let chars: Vec<char> = SAMPLE.chars().collect();

    for strategy in AggregationStrategy::ALL {
        let model = PiiModel::load(&runtime_config(dir.path(), strategy)).unwrap();
        assert_eq!(model.device(), "cpu");
        assert_eq!(
            model.labels(),
            ["B-EMAIL", "B-PHONE", "I-EMAIL", "I-PHONE", "O"]
        );
        assert!(model.warmup_error().is_none());

        let spans = model.infer(SAMPLE).unwrap();
        for span in &spans {
            assert!(span.start <= span.end, "{:?} under {}", span, strategy);
            assert!(span.end <= TRUNCATED_CHARS, "{:?} past the encoded prefix", span);
            let sliced: String = chars[span.start..span.end].iter().collect();
            assert_eq!(span.text, sliced, "under {}", strategy);
            assert!(["EMAIL", "PHONE"].contains(&span.label.as_str()));
        }

        assert_eq!(model.infer(SAMPLE).unwrap(), spans);
    }
}

#[test]
fn test_bare_encoder_checkpoint_loads() {
    let dir = checkpoint(None);
    let model = PiiModel::load(&runtime_config(dir.path(), AggregationStrategy::First)).unwrap();

    assert!(model.warmup_error().is_none());
    assert!(model.infer("").unwrap().is_empty());

    let outcomes = model.infer_batch_isolated(&["전화 010-1234-5678", SAMPLE]);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(Result::is_ok));
}
