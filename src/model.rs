use serde::{Deserialize, Serialize};

/// One summary to evaluate, with whatever trace metadata the source carried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub record_id: String,
    pub source_file: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub sector: Option<String>,
    pub model: Option<String>,
    pub persona: Option<String>,
    pub source_text: String,
    pub reference_summary: String,
    pub generated_summary: String,
}

/// Content-side sub-scores for one item. Optional fields are missing when
/// the corresponding sub-scorer is disabled or failed.
#[derive(Debug, Clone, Serialize)]
pub struct ContentMetrics {
    pub rouge1_f: Option<f64>,
    pub rouge2_f: Option<f64>,
    pub rouge_l_f: Option<f64>,
    pub rouge1_r: Option<f64>,
    pub rouge2_r: Option<f64>,
    pub rouge_l_r: Option<f64>,
    pub embedding_f1: Option<f64>,
    pub quality_score: Option<f64>,
    pub source_tokens: usize,
    pub reference_tokens: usize,
    pub hypothesis_tokens: usize,
    pub compression_ratio: f64,
    pub content_quality: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub record_id: String,
    pub source_file: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub sector: Option<String>,
    pub model: Option<String>,
    pub persona: Option<String>,
    #[serde(flatten)]
    pub content: ContentMetrics,
    pub style_similarity: Option<f64>,
    pub overall_quality: f64,
}

/// How a computation treats missing sub-scores. Composite scores zero-fill;
/// aggregate statistics exclude. The asymmetry is deliberate: a composite
/// must stay comparable across items, a mean must not be dragged toward
/// zero by scorers that never ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    ZeroFill,
    Exclude,
}

impl MissingPolicy {
    pub fn weighted_sum(self, terms: &[(f64, Option<f64>)]) -> f64 {
        match self {
            Self::ZeroFill => terms.iter().map(|(w, v)| w * v.unwrap_or(0.0)).sum(),
            Self::Exclude => terms.iter().filter_map(|(w, v)| v.map(|v| w * v)).sum(),
        }
    }

    pub fn admit(self, values: impl IntoIterator<Item = Option<f64>>) -> Vec<f64> {
        match self {
            Self::ZeroFill => values.into_iter().map(|v| v.unwrap_or(0.0)).collect(),
            Self::Exclude => values.into_iter().flatten().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPaths {
    pub out_dir: String,
    pub centroid_cache_path: String,
    pub metrics_csv_path: String,
    pub aggregates_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCounts {
    pub records_seen: usize,
    pub records_loaded: usize,
    pub records_skipped: usize,
    pub items_evaluated: usize,
    pub personas_configured: usize,
    pub centroids_built: usize,
    pub style_scored: usize,
    pub embedding_scored: usize,
    pub quality_scored: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: String,
    pub command: String,
    pub tool_version: String,
    pub config_source: Option<String>,
    pub config_sha256: Option<String>,
    pub paths: RunPaths,
    pub counts: RunCounts,
    pub warnings: Vec<String>,
}

pub const RUN_MANIFEST_VERSION: u32 = 1;
