use std::f64::consts::LN_2;

use anyhow::Result;
use tracing::warn;

use crate::style::centroid::CentroidStore;
use crate::style::features::{self, FeatureVector, FEATURE_DIMS};

const EPSILON: f64 = 1e-10;

/// Scores how closely a text's stylometric profile matches a persona
/// centroid. Returns `None` when style scoring is disabled, no persona is
/// assigned, or the persona has no centroid.
#[derive(Debug)]
pub struct StyleScorer {
    enabled: bool,
    store: CentroidStore,
}

impl StyleScorer {
    pub fn new(enabled: bool, store: CentroidStore) -> Self {
        Self { enabled, store }
    }

    pub fn store_mut(&mut self) -> &mut CentroidStore {
        &mut self.store
    }

    pub fn similarity(&mut self, text: &str, persona_id: Option<&str>) -> Result<Option<f64>> {
        if !self.enabled {
            return Ok(None);
        }

        let Some(persona_id) = persona_id else {
            return Ok(None);
        };

        let Some(centroid) = self.store.get(persona_id)? else {
            warn!(persona = %persona_id, "no centroid for persona, style similarity unavailable");
            return Ok(None);
        };

        let text_features = features::extract(text);
        let divergence =
            jensen_shannon_divergence(&to_distribution(&text_features), &to_distribution(&centroid));

        Ok(Some(1.0 - divergence))
    }
}

/// Epsilon-smooth a feature vector and renormalize it to sum to one. The
/// result is a pseudo-distribution over the feature bins, used only so a
/// bounded symmetric divergence applies; dimensions are not probabilities.
fn to_distribution(vector: &FeatureVector) -> [f64; FEATURE_DIMS] {
    let mut out = [0.0; FEATURE_DIMS];
    let mut sum = 0.0;
    for (slot, value) in out.iter_mut().zip(vector.iter()) {
        *slot = value + EPSILON;
        sum += *slot;
    }
    for slot in out.iter_mut() {
        *slot /= sum;
    }
    out
}

/// Jensen-Shannon divergence with natural logs, normalized by ln 2 so the
/// value lies in [0,1]. Inputs must be strictly positive distributions.
fn jensen_shannon_divergence(p: &[f64; FEATURE_DIMS], q: &[f64; FEATURE_DIMS]) -> f64 {
    let mut divergence = 0.0;
    for i in 0..FEATURE_DIMS {
        let m = 0.5 * (p[i] + q[i]);
        divergence += 0.5 * p[i] * (p[i] / m).ln();
        divergence += 0.5 * q[i] * (q[i] / m).ln();
    }

    (divergence / LN_2).clamp(0.0, 1.0)
}
