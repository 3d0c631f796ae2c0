use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_MODEL_ID: &str = "miniLM-L6-v2-local-v1";
pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const MAX_TOKENS: usize = 512;

const BOUNDARY_START: &str = "<s>";
const BOUNDARY_END: &str = "</s>";

#[derive(Debug, Clone, Deserialize)]
pub struct EncoderConfig {
    pub model_id: String,
    pub model_name: String,
    pub dimensions: usize,
}

#[derive(Debug)]
enum EncoderState {
    Unloaded,
    Loaded(Encoder),
    Failed,
}

/// Token-level embedding similarity with an explicit one-shot load state.
/// The encoder resolves from a local model directory when configured and
/// present, else from the built-in registry; a load failure makes the
/// sub-score permanently unavailable for the process.
#[derive(Debug)]
pub struct EmbeddingScorer {
    enabled: bool,
    model_dir: Option<PathBuf>,
    model_id: String,
    state: EncoderState,
}

impl EmbeddingScorer {
    pub fn new(enabled: bool, model_dir: Option<PathBuf>, model_id: String) -> Self {
        Self {
            enabled,
            model_dir,
            model_id,
            state: EncoderState::Unloaded,
        }
    }

    /// Greedy-alignment F1 between reference and hypothesis token
    /// embeddings, or `None` when disabled, failed, or either side has no
    /// content tokens.
    pub fn score(&mut self, reference: &str, hypothesis: &str) -> Option<f64> {
        if !self.enabled {
            return None;
        }

        let encoder = self.ensure_loaded()?;

        let ref_rows = encoder.encode(reference);
        let hyp_rows = encoder.encode(hypothesis);

        // Drop the sequence boundary rows before alignment.
        let ref_rows = &ref_rows[1..ref_rows.len() - 1];
        let hyp_rows = &hyp_rows[1..hyp_rows.len() - 1];

        if ref_rows.is_empty() || hyp_rows.is_empty() {
            return None;
        }

        let precision = mean_best_cosine(hyp_rows, ref_rows);
        let recall = mean_best_cosine(ref_rows, hyp_rows);

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Some(f1)
    }

    fn ensure_loaded(&mut self) -> Option<&Encoder> {
        if matches!(self.state, EncoderState::Unloaded) {
            match load_encoder(self.model_dir.as_deref(), &self.model_id) {
                Ok(encoder) => {
                    info!(
                        model_id = %encoder.config.model_id,
                        dimensions = encoder.config.dimensions,
                        "embedding encoder loaded"
                    );
                    self.state = EncoderState::Loaded(encoder);
                }
                Err(err) => {
                    warn!(error = %err, "embedding encoder load failed, sub-score unavailable");
                    self.state = EncoderState::Failed;
                }
            }
        }

        match &self.state {
            EncoderState::Loaded(encoder) => Some(encoder),
            _ => None,
        }
    }
}

fn load_encoder(model_dir: Option<&Path>, model_id: &str) -> Result<Encoder> {
    if let Some(dir) = model_dir {
        let config_path = dir.join("config.json");
        if config_path.exists() {
            let data = fs::read_to_string(&config_path).with_context(|| {
                format!("failed to read encoder config: {}", config_path.display())
            })?;
            let config: EncoderConfig = serde_json::from_str(&data).with_context(|| {
                format!("failed to parse encoder config: {}", config_path.display())
            })?;
            return Ok(Encoder { config });
        }
        warn!(
            model_dir = %dir.display(),
            "local model directory has no config.json, falling back to registry"
        );
    }

    let trimmed = model_id.trim();
    if trimmed.is_empty() || trimmed == DEFAULT_MODEL_ID {
        return Ok(Encoder {
            config: EncoderConfig {
                model_id: DEFAULT_MODEL_ID.to_string(),
                model_name: DEFAULT_MODEL_NAME.to_string(),
                dimensions: DEFAULT_EMBEDDING_DIM,
            },
        });
    }

    bail!("unknown embedding model id: {trimmed}");
}

#[derive(Debug)]
struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    /// Per-token embedding rows, truncated to `MAX_TOKENS` tokens and
    /// wrapped in sequence boundary rows.
    fn encode(&self, text: &str) -> Vec<Vec<f32>> {
        let mut tokens = encoder_tokens(text);
        tokens.truncate(MAX_TOKENS);

        let mut rows = Vec::with_capacity(tokens.len() + 2);
        rows.push(self.embed_token(BOUNDARY_START));
        for token in &tokens {
            rows.push(self.embed_token(token));
        }
        rows.push(self.embed_token(BOUNDARY_END));
        rows
    }

    fn embed_token(&self, token: &str) -> Vec<f32> {
        let dims = self.config.dimensions.max(8);
        let mut vector = vec![0_f32; dims];

        for feature in token_features(token) {
            let hash = stable_hash(&feature);
            let index = (hash as usize) % dims;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            let weight = 1.0 + (((hash >> 48) & 0xFF) as f32 / 255.0);
            vector[index] += sign * weight;
        }

        normalize_vector(&mut vector);
        vector
    }
}

fn encoder_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| {
            raw.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Word identity plus character trigrams, so near-identical surface forms
/// land close in the hashed space.
fn token_features(token: &str) -> Vec<String> {
    let mut features = vec![format!("w:{token}")];
    let chars: Vec<char> = token.chars().collect();
    for window in chars.windows(3) {
        features.push(format!("c:{}{}{}", window[0], window[1], window[2]));
    }
    features
}

fn stable_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn normalize_vector(values: &mut [f32]) {
    let squared_norm = values
        .iter()
        .map(|value| f64::from(*value) * f64::from(*value))
        .sum::<f64>();

    if squared_norm <= 0.0 {
        return;
    }

    let norm = squared_norm.sqrt() as f32;
    if norm == 0.0 {
        return;
    }

    for value in values {
        *value /= norm;
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    left.iter()
        .zip(right.iter())
        .map(|(l, r)| f64::from(*l) * f64::from(*r))
        .sum::<f64>()
}

fn mean_best_cosine(from: &[Vec<f32>], against: &[Vec<f32>]) -> f64 {
    let mut total = 0.0;
    for row in from {
        let best = against
            .iter()
            .map(|other| cosine_similarity(row, other))
            .fold(f64::NEG_INFINITY, f64::max);
        total += best;
    }
    total / from.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_scorer() -> EmbeddingScorer {
        EmbeddingScorer::new(true, None, DEFAULT_MODEL_ID.to_string())
    }

    #[test]
    fn identical_texts_score_near_one() {
        let mut scorer = default_scorer();
        let f1 = scorer
            .score("The cat sat on the mat.", "The cat sat on the mat.")
            .unwrap();
        assert!((f1 - 1.0).abs() < 1e-6, "identical texts: {f1}");
    }

    #[test]
    fn similar_beats_dissimilar() {
        let mut scorer = default_scorer();
        let close = scorer
            .score("The report shows growth.", "The report showed growth.")
            .unwrap();
        let far = scorer
            .score("The report shows growth.", "Bananas ripen quickly overseas.")
            .unwrap();
        assert!(close > far, "close {close} should beat far {far}");
    }

    #[test]
    fn empty_side_is_missing() {
        let mut scorer = default_scorer();
        assert!(scorer.score("", "words here").is_none());
        assert!(scorer.score("words here", "").is_none());
        assert!(scorer.score("?!,.", "words").is_none());
    }

    #[test]
    fn disabled_scorer_is_missing() {
        let mut scorer = EmbeddingScorer::new(false, None, DEFAULT_MODEL_ID.to_string());
        assert!(scorer.score("a b", "a b").is_none());
    }

    #[test]
    fn unknown_model_id_fails_permanently() {
        let mut scorer = EmbeddingScorer::new(true, None, "no-such-model".to_string());
        assert!(scorer.score("a b", "a b").is_none());
        assert!(matches!(scorer.state, EncoderState::Failed));
        // Second call must not re-attempt the load.
        assert!(scorer.score("a b", "a b").is_none());
    }

    #[test]
    fn local_model_dir_overrides_registry() {
        let dir = std::env::temp_dir().join(format!("summeval-encoder-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.json"),
            r#"{"model_id": "local-test", "model_name": "local/test", "dimensions": 64}"#,
        )
        .unwrap();

        let mut scorer = EmbeddingScorer::new(true, Some(dir), "ignored".to_string());
        let f1 = scorer.score("a b c", "a b c").unwrap();
        assert!((f1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn corrupt_local_config_fails_permanently() {
        let dir =
            std::env::temp_dir().join(format!("summeval-encoder-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.json"), "{not json").unwrap();

        let mut scorer = EmbeddingScorer::new(true, Some(dir), DEFAULT_MODEL_ID.to_string());
        assert!(scorer.score("a b", "a b").is_none());
    }

    #[test]
    fn long_input_is_truncated_not_rejected() {
        let mut scorer = default_scorer();
        let long = std::iter::repeat("token")
            .take(MAX_TOKENS * 2)
            .collect::<Vec<_>>()
            .join(" ");
        assert!(scorer.score(&long, "token token").is_some());
    }

    #[test]
    fn f1_is_bounded() {
        let mut scorer = default_scorer();
        let f1 = scorer
            .score("alpha beta gamma delta", "epsilon zeta eta theta")
            .unwrap();
        assert!(f1 <= 1.0 + 1e-9);
    }
}
