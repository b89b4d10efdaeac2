//! Merging per-token predictions into entity groups.

use std::fmt;
use std::str::FromStr;

use super::{EntityGroup, slice_chars};
use crate::ml::error::MLError;
use crate::ml::labels::{BioPrefix, LabelMap, split_tag};
use crate::ml::tokenizer::TokenizedText;

/// How sub-word token predictions become entity predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationStrategy {
    /// Every token is classified on its own
    #[default]
    Simple,
    /// A word takes the prediction of its first token
    First,
    /// A word takes the argmax of its tokens' averaged distributions
    Average,
    /// A word takes the prediction of its most confident token
    Max,
}

impl AggregationStrategy {
    pub const ALL: [AggregationStrategy; 4] = [
        AggregationStrategy::Simple,
        AggregationStrategy::First,
        AggregationStrategy::Average,
        AggregationStrategy::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationStrategy::Simple => "simple",
            AggregationStrategy::First => "first",
            AggregationStrategy::Average => "average",
            AggregationStrategy::Max => "max",
        }
    }
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationStrategy {
    type Err = MLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == name)
            .ok_or_else(|| {
                MLError::configuration(format!(
                    "Unknown aggregation strategy '{}'; expected simple, first, average or max",
                    s
                ))
            })
    }
}

/// A non-special token with its label distribution.
struct PreEntity<'a> {
    start: usize,
    end: usize,
    word_id: Option<u32>,
    scores: &'a [f32],
}

/// A token or word with a chosen label.
#[derive(Debug)]
struct LabeledEntity {
    label: String,
    score: f32,
    start: usize,
    end: usize,
}

/// Turn token probabilities (`probs[token][label]`) into entity groups.
///
/// Special tokens are skipped and groups tagged `O` are dropped.
pub fn aggregate(
    strategy: AggregationStrategy,
    text: &str,
    encoded: &TokenizedText,
    probs: &[Vec<f32>],
    labels: &LabelMap,
) -> Vec<EntityGroup> {
    let pre_entities = gather_pre_entities(encoded, probs);

    let entities: Vec<LabeledEntity> = match strategy {
        AggregationStrategy::Simple => pre_entities
            .iter()
            .map(|pre| {
                let (id, score) = argmax(pre.scores);
                LabeledEntity {
                    label: label_for(labels, id),
                    score,
                    start: pre.start,
                    end: pre.end,
                }
            })
            .collect(),
        _ => group_words(&pre_entities)
            .iter()
            .filter_map(|word| aggregate_word(word, strategy, labels))
            .collect(),
    };

    group_entities(&entities)
        .into_iter()
        .filter(|group| group.entity_group.as_deref() != Some("O"))
        .map(|mut group| {
            group.word = slice_chars(text, group.start, group.end);
            group
        })
        .collect()
}

fn gather_pre_entities<'a>(
    encoded: &'a TokenizedText,
    probs: &'a [Vec<f32>],
) -> Vec<PreEntity<'a>> {
    probs
        .iter()
        .enumerate()
        .filter(|(idx, _)| !encoded.is_special(*idx))
        .filter_map(|(idx, scores)| {
            let (start, end) = *encoded.offsets.get(idx)?;
            Some(PreEntity {
                start,
                end,
                word_id: encoded.word_ids.get(idx).copied().flatten(),
                scores,
            })
        })
        .collect()
}

/// Split tokens into words; a token sharing the previous token's word id is a sub-word.
fn group_words<'a, 'b>(pre_entities: &'b [PreEntity<'a>]) -> Vec<Vec<&'b PreEntity<'a>>> {
    let mut words: Vec<Vec<&PreEntity>> = Vec::new();
    let mut previous: Option<u32> = None;

    for pre in pre_entities {
        let is_subword = pre.word_id.is_some() && pre.word_id == previous;
        match words.last_mut() {
            Some(word) if is_subword => word.push(pre),
            _ => words.push(vec![pre]),
        }
        previous = pre.word_id;
    }

    words
}

fn aggregate_word(
    word: &[&PreEntity],
    strategy: AggregationStrategy,
    labels: &LabelMap,
) -> Option<LabeledEntity> {
    let first = word.first()?;
    let last = word.last()?;

    let (id, score) = match strategy {
        AggregationStrategy::Simple | AggregationStrategy::First => argmax(first.scores),
        AggregationStrategy::Max => {
            let mut best = first;
            for candidate in &word[1..] {
                if argmax(candidate.scores).1 > argmax(best.scores).1 {
                    best = candidate;
                }
            }
            argmax(best.scores)
        }
        AggregationStrategy::Average => {
            let mut averaged = vec![0.0f32; first.scores.len()];
            for token in word {
                for (sum, score) in averaged.iter_mut().zip(token.scores) {
                    *sum += score;
                }
            }
            let count = word.len() as f32;
            averaged.iter_mut().for_each(|sum| *sum /= count);
            argmax(&averaged)
        }
    };

    Some(LabeledEntity {
        label: label_for(labels, id),
        score,
        start: first.start,
        end: last.end,
    })
}

/// Merge consecutive entities sharing a tag, unless the next one begins a new entity.
fn group_entities(entities: &[LabeledEntity]) -> Vec<EntityGroup> {
    let mut groups: Vec<(&str, Vec<&LabeledEntity>)> = Vec::new();

    for entity in entities {
        let (prefix, tag) = split_tag(&entity.label);
        if let Some((group_tag, members)) = groups.last_mut()
            && *group_tag == tag
            && prefix != BioPrefix::Begin
        {
            members.push(entity);
            continue;
        }
        groups.push((tag, vec![entity]));
    }

    groups
        .into_iter()
        .filter_map(|(tag, members)| {
            let first = members.first()?;
            let last = members.last()?;
            let score = members.iter().map(|e| e.score).sum::<f32>() / members.len() as f32;
            Some(EntityGroup::grouped(tag, score, first.start, last.end, String::new()))
        })
        .collect()
}

/// Index and value of the first maximum.
fn argmax(scores: &[f32]) -> (usize, f32) {
    let mut best = (0, f32::NEG_INFINITY);
    for (idx, &score) in scores.iter().enumerate() {
        if score > best.1 {
            best = (idx, score);
        }
    }
    if best.1 == f32::NEG_INFINITY {
        (best.0, 0.0)
    } else {
        best
    }
}

fn label_for(labels: &LabelMap, id: usize) -> String {
    labels
        .get(id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("LABEL_{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const O: usize = 0;
    const B_EMAIL: usize = 1;
    const I_EMAIL: usize = 2;
    const B_PHONE: usize = 3;

    fn labels() -> LabelMap {
        LabelMap::new(
            ["O", "B-EMAIL", "I-EMAIL", "B-PHONE", "I-PHONE"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
        .unwrap()
    }

    /// Distribution putting `score` on `label` and spreading the rest evenly.
    fn dist(label: usize, score: f32) -> Vec<f32> {
        let rest = (1.0 - score) / 4.0;
        (0..5).map(|i| if i == label { score } else { rest }).collect()
    }

    /// Wrap `tokens` (offsets, word id) in `<s>`/`</s>` special tokens.
    fn encode(tokens: &[((usize, usize), u32)]) -> TokenizedText {
        let mut encoded = TokenizedText::default();
        encoded.offsets.push((0, 0));
        encoded.word_ids.push(None);
        encoded.special_tokens_mask.push(1);
        for (offsets, word_id) in tokens {
            encoded.offsets.push(*offsets);
            encoded.word_ids.push(Some(*word_id));
            encoded.special_tokens_mask.push(0);
        }
        encoded.offsets.push((0, 0));
        encoded.word_ids.push(None);
        encoded.special_tokens_mask.push(1);
        encoded.ids = vec![0; encoded.offsets.len()];
        encoded
    }

    /// Probabilities for `encode`d tokens, special tokens predicting `B-PHONE`.
    fn with_specials(token_probs: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
        let mut probs = vec![dist(B_PHONE, 0.99)];
        probs.extend(token_probs);
        probs.push(dist(B_PHONE, 0.99));
        probs
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!((actual - expected).abs() < 1e-5, "{} != {}", actual, expected);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("simple".parse::<AggregationStrategy>().unwrap(), AggregationStrategy::Simple);
        assert_eq!("FIRST".parse::<AggregationStrategy>().unwrap(), AggregationStrategy::First);
        assert_eq!(" Average ".parse::<AggregationStrategy>().unwrap(), AggregationStrategy::Average);
        assert_eq!("max".parse::<AggregationStrategy>().unwrap(), AggregationStrategy::Max);
        assert!(matches!(
            "none".parse::<AggregationStrategy>(),
            Err(MLError::Configuration(_))
        ));
        assert_eq!(AggregationStrategy::default().to_string(), "simple");
    }

    #[test]
    fn test_bio_sequence_groups_into_two_entities() {
        let text = "a@b.c x 010";
        let encoded = encode(&[((0, 3), 0), ((3, 5), 0), ((6, 7), 1), ((8, 11), 2)]);
        let probs = with_specials(vec![
            dist(B_EMAIL, 0.9),
            dist(I_EMAIL, 0.8),
            dist(O, 0.99),
            dist(B_PHONE, 0.7),
        ]);

        let groups = aggregate(AggregationStrategy::Simple, text, &encoded, &probs, &labels());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].entity_group.as_deref(), Some("EMAIL"));
        assert_eq!((groups[0].start, groups[0].end), (0, 5));
        assert_eq!(groups[0].word, "a@b.c");
        assert_close(groups[0].score.unwrap(), 0.85);

        assert_eq!(groups[1].entity_group.as_deref(), Some("PHONE"));
        assert_eq!((groups[1].start, groups[1].end), (8, 11));
        assert_eq!(groups[1].word, "010");
        assert_close(groups[1].score.unwrap(), 0.7);
    }

    #[test]
    fn test_begin_label_starts_new_group() {
        let text = "010 011";
        let encoded = encode(&[((0, 3), 0), ((4, 7), 1)]);
        let probs = with_specials(vec![dist(B_PHONE, 0.9), dist(B_PHONE, 0.9)]);

        let groups = aggregate(AggregationStrategy::Simple, text, &encoded, &probs, &labels());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].word, "010");
        assert_eq!(groups[1].word, "011");
    }

    #[test]
    fn test_unprefixed_labels_merge() {
        let labels = LabelMap::new(vec!["O".into(), "EMAIL".into()]).unwrap();
        let encoded = encode(&[((0, 2), 0), ((2, 4), 0)]);
        let probs = vec![vec![0.9, 0.1], vec![0.2, 0.8], vec![0.4, 0.6], vec![0.9, 0.1]];

        let groups = aggregate(AggregationStrategy::Simple, "ab@c", &encoded, &probs, &labels);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].entity_group.as_deref(), Some("EMAIL"));
        assert_eq!(groups[0].word, "ab@c");
        assert_close(groups[0].score.unwrap(), 0.7);
    }

    #[test]
    fn test_special_tokens_are_skipped() {
        let encoded = encode(&[((0, 1), 0)]);
        let probs = with_specials(vec![dist(O, 0.9)]);

        let groups = aggregate(AggregationStrategy::Simple, "x", &encoded, &probs, &labels());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let groups = aggregate(
            AggregationStrategy::First,
            "",
            &TokenizedText::default(),
            &[],
            &labels(),
        );
        assert!(groups.is_empty());
    }

    /// One word split into two sub-words whose predictions disagree.
    fn disagreeing_word() -> (TokenizedText, Vec<Vec<f32>>) {
        let encoded = encode(&[((0, 4), 0), ((4, 9), 0)]);
        let probs = with_specials(vec![
            vec![0.45, 0.5, 0.05, 0.0, 0.0],
            vec![0.45, 0.0, 0.0, 0.55, 0.0],
        ]);
        (encoded, probs)
    }

    #[test]
    fn test_first_uses_first_subword() {
        let (encoded, probs) = disagreeing_word();
        let groups = aggregate(AggregationStrategy::First, "johnsmith", &encoded, &probs, &labels());

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].entity_group.as_deref(), Some("EMAIL"));
        assert_eq!((groups[0].start, groups[0].end), (0, 9));
        assert_close(groups[0].score.unwrap(), 0.5);
    }

    #[test]
    fn test_max_uses_most_confident_subword() {
        let (encoded, probs) = disagreeing_word();
        let groups = aggregate(AggregationStrategy::Max, "johnsmith", &encoded, &probs, &labels());

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].entity_group.as_deref(), Some("PHONE"));
        assert_eq!(groups[0].word, "johnsmith");
        assert_close(groups[0].score.unwrap(), 0.55);
    }

    #[test]
    fn test_average_uses_mean_distribution() {
        let (encoded, probs) = disagreeing_word();
        // Mean is [0.45, 0.25, 0.025, 0.275, 0.0]: the word is O
        let groups = aggregate(AggregationStrategy::Average, "johnsmith", &encoded, &probs, &labels());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_simple_ignores_word_boundaries() {
        let (encoded, probs) = disagreeing_word();
        let groups = aggregate(AggregationStrategy::Simple, "johnsmith", &encoded, &probs, &labels());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].word, "john");
        assert_eq!(groups[1].word, "smith");
    }

    #[test]
    fn test_word_level_grouping_across_words() {
        let text = "bob@x.io now";
        let encoded = encode(&[((0, 3), 0), ((3, 8), 0), ((9, 12), 1)]);
        let probs = with_specials(vec![dist(B_EMAIL, 0.8), dist(I_EMAIL, 0.6), dist(O, 0.9)]);

        for strategy in [AggregationStrategy::First, AggregationStrategy::Max] {
            let groups = aggregate(strategy, text, &encoded, &probs, &labels());
            assert_eq!(groups.len(), 1, "{}", strategy);
            assert_eq!(groups[0].word, "bob@x.io");
            assert_close(groups[0].score.unwrap(), 0.8);
        }
    }

    #[test]
    fn test_multibyte_offsets() {
        let text = "전화 01012345678";
        let encoded = encode(&[((0, 2), 0), ((3, 14), 1)]);
        let probs = with_specials(vec![dist(O, 0.9), dist(B_PHONE, 0.95)]);

        let groups = aggregate(AggregationStrategy::First, text, &encoded, &probs, &labels());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].word, "01012345678");
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), (1, 0.4));
        assert_eq!(argmax(&[]), (0, 0.0));
    }

    #[test]
    fn test_unknown_class_id_gets_placeholder_label() {
        let labels = LabelMap::new(vec!["O".into()]).unwrap();
        assert_eq!(label_for(&labels, 7), "LABEL_7");
    }
}
