use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{EvaluationResult, MissingPolicy};

/// Numeric metrics carried into aggregate statistics, in output order.
pub const METRIC_NAMES: &[&str] = &[
    "rouge1_f",
    "rouge2_f",
    "rouge_l_f",
    "rouge1_r",
    "rouge2_r",
    "rouge_l_r",
    "embedding_f1",
    "quality_score",
    "compression_ratio",
    "content_quality",
    "style_similarity",
    "overall_quality",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricStats {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n-1); `None` below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

pub type GroupStats = BTreeMap<String, MetricStats>;

#[derive(Debug, Serialize)]
pub struct Aggregates {
    pub total_items: usize,
    pub overall: GroupStats,
    pub by_persona: BTreeMap<String, GroupStats>,
    pub by_sector: BTreeMap<String, GroupStats>,
    pub by_model: BTreeMap<String, GroupStats>,
}

/// Roll per-item results into grouped statistics. Missing metric values
/// are excluded (`MissingPolicy::Exclude`), never zero-filled; a metric
/// with no values in a group is omitted from that group.
pub fn aggregate(results: &[EvaluationResult]) -> Aggregates {
    let all: Vec<&EvaluationResult> = results.iter().collect();

    Aggregates {
        total_items: results.len(),
        overall: group_stats(&all),
        by_persona: grouped(results, |r| r.persona.as_deref()),
        by_sector: grouped(results, |r| r.sector.as_deref()),
        by_model: grouped(results, |r| r.model.as_deref()),
    }
}

fn grouped<'a>(
    results: &'a [EvaluationResult],
    key: impl Fn(&'a EvaluationResult) -> Option<&'a str>,
) -> BTreeMap<String, GroupStats> {
    let mut groups: BTreeMap<String, Vec<&EvaluationResult>> = BTreeMap::new();
    for result in results {
        let Some(group_key) = key(result) else {
            continue;
        };
        if group_key.is_empty() {
            continue;
        }
        groups.entry(group_key.to_string()).or_default().push(result);
    }

    groups
        .into_iter()
        .map(|(group_key, members)| (group_key, group_stats(&members)))
        .collect()
}

fn group_stats(results: &[&EvaluationResult]) -> GroupStats {
    let mut stats = GroupStats::new();
    for name in METRIC_NAMES {
        let values =
            MissingPolicy::Exclude.admit(results.iter().map(|r| metric_value(r, name)));
        if let Some(metric_stats) = metric_stats(&values) {
            stats.insert((*name).to_string(), metric_stats);
        }
    }
    stats
}

fn metric_value(result: &EvaluationResult, name: &str) -> Option<f64> {
    match name {
        "rouge1_f" => result.content.rouge1_f,
        "rouge2_f" => result.content.rouge2_f,
        "rouge_l_f" => result.content.rouge_l_f,
        "rouge1_r" => result.content.rouge1_r,
        "rouge2_r" => result.content.rouge2_r,
        "rouge_l_r" => result.content.rouge_l_r,
        "embedding_f1" => result.content.embedding_f1,
        "quality_score" => result.content.quality_score,
        "compression_ratio" => Some(result.content.compression_ratio),
        "content_quality" => Some(result.content.content_quality),
        "style_similarity" => result.style_similarity,
        "overall_quality" => Some(result.overall_quality),
        _ => None,
    }
}

fn metric_stats(values: &[f64]) -> Option<MetricStats> {
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("metric values are finite"));
    let median = if count % 2 == 1 {
        sorted[count / 2]
    } else {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    };

    let std = if count >= 2 {
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        Some(variance.sqrt())
    } else {
        None
    };

    Some(MetricStats {
        mean,
        median,
        std,
        min: sorted[0],
        max: sorted[count - 1],
        count,
    })
}
