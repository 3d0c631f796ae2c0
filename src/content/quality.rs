use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::content::lexical;

/// Linear-regressor checkpoint for the learned quality model. The weights
/// apply to the model's own internal features of a (reference, candidate)
/// pair; the output is a scalar judgment in roughly [-1, 1].
#[derive(Debug, Clone, Deserialize)]
pub struct QualityCheckpoint {
    pub name: String,
    pub bias: f64,
    pub weights: QualityWeights,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualityWeights {
    pub token_jaccard: f64,
    pub length_ratio: f64,
    pub lcs_f: f64,
}

#[derive(Debug)]
enum ModelState {
    Unloaded,
    Loaded(QualityCheckpoint),
    Failed,
}

/// Pretrained quality regressor behind an opaque `score` seam, loaded once
/// from a checkpoint path. No configured checkpoint, or a corrupt one,
/// makes the sub-score permanently unavailable for the process.
#[derive(Debug)]
pub struct QualityModel {
    enabled: bool,
    checkpoint_path: Option<PathBuf>,
    state: ModelState,
}

impl QualityModel {
    pub fn new(enabled: bool, checkpoint_path: Option<PathBuf>) -> Self {
        Self {
            enabled,
            checkpoint_path,
            state: ModelState::Unloaded,
        }
    }

    /// One scalar judgment per (reference, candidate) pair, clamped to
    /// [-1, 1]. `None` when the model is disabled or unavailable.
    pub fn score(&mut self, references: &[&str], candidates: &[&str]) -> Option<Vec<f64>> {
        if !self.enabled {
            return None;
        }

        let checkpoint = self.ensure_loaded()?;

        let scores = references
            .iter()
            .zip(candidates.iter())
            .map(|(reference, candidate)| predict(checkpoint, reference, candidate))
            .collect();

        Some(scores)
    }

    fn ensure_loaded(&mut self) -> Option<&QualityCheckpoint> {
        if matches!(self.state, ModelState::Unloaded) {
            match self.load_checkpoint() {
                Ok(checkpoint) => {
                    info!(model = %checkpoint.name, "quality model loaded");
                    self.state = ModelState::Loaded(checkpoint);
                }
                Err(err) => {
                    warn!(error = %err, "quality model unavailable");
                    self.state = ModelState::Failed;
                }
            }
        }

        match &self.state {
            ModelState::Loaded(checkpoint) => Some(checkpoint),
            _ => None,
        }
    }

    fn load_checkpoint(&self) -> Result<QualityCheckpoint> {
        let path = self
            .checkpoint_path
            .as_ref()
            .context("no quality checkpoint configured")?;

        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read quality checkpoint: {}", path.display()))?;
        let checkpoint: QualityCheckpoint = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse quality checkpoint: {}", path.display()))?;

        debug!(path = %path.display(), "parsed quality checkpoint");
        Ok(checkpoint)
    }
}

fn predict(checkpoint: &QualityCheckpoint, reference: &str, candidate: &str) -> f64 {
    let ref_tokens = lexical::content_tokens(reference);
    let cand_tokens = lexical::content_tokens(candidate);

    let ref_set: HashSet<&str> = ref_tokens.iter().map(|t| t.as_str()).collect();
    let cand_set: HashSet<&str> = cand_tokens.iter().map(|t| t.as_str()).collect();

    let union = ref_set.union(&cand_set).count();
    let token_jaccard = if union > 0 {
        ref_set.intersection(&cand_set).count() as f64 / union as f64
    } else {
        0.0
    };

    let length_ratio = if ref_tokens.is_empty() || cand_tokens.is_empty() {
        0.0
    } else {
        let longer = ref_tokens.len().max(cand_tokens.len()) as f64;
        let shorter = ref_tokens.len().min(cand_tokens.len()) as f64;
        shorter / longer
    };

    let lcs_f = lexical::score(reference, candidate).lcs.f_measure;

    let raw = checkpoint.bias
        + checkpoint.weights.token_jaccard * token_jaccard
        + checkpoint.weights.length_ratio * length_ratio
        + checkpoint.weights.lcs_f * lcs_f;

    raw.clamp(-1.0, 1.0)
}
