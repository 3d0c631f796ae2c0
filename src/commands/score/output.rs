use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::EvaluationResult;
use crate::util::ensure_directory;

pub const CSV_COLUMNS: &[&str] = &[
    "record_id",
    "source_file",
    "title",
    "author",
    "sector",
    "model",
    "persona",
    "rouge1_f",
    "rouge2_f",
    "rouge_l_f",
    "rouge1_r",
    "rouge2_r",
    "rouge_l_r",
    "embedding_f1",
    "quality_score",
    "source_tokens",
    "reference_tokens",
    "hypothesis_tokens",
    "compression_ratio",
    "content_quality",
    "style_similarity",
    "overall_quality",
];

/// One row per evaluated item. Missing sub-scores are empty cells, never
/// zeros, so downstream tooling can distinguish absent from worst-case.
pub fn write_metrics_csv(path: &Path, results: &[EvaluationResult]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create metrics csv: {}", path.display()))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", CSV_COLUMNS.join(","))
        .with_context(|| format!("failed to write metrics csv: {}", path.display()))?;

    for result in results {
        writeln!(out, "{}", row(result).join(","))
            .with_context(|| format!("failed to write metrics csv: {}", path.display()))?;
    }

    out.flush()
        .with_context(|| format!("failed to flush metrics csv: {}", path.display()))
}

fn row(result: &EvaluationResult) -> Vec<String> {
    vec![
        csv_field(&result.record_id),
        opt_field(result.source_file.as_deref()),
        opt_field(result.title.as_deref()),
        opt_field(result.author.as_deref()),
        opt_field(result.sector.as_deref()),
        opt_field(result.model.as_deref()),
        opt_field(result.persona.as_deref()),
        opt_number(result.content.rouge1_f),
        opt_number(result.content.rouge2_f),
        opt_number(result.content.rouge_l_f),
        opt_number(result.content.rouge1_r),
        opt_number(result.content.rouge2_r),
        opt_number(result.content.rouge_l_r),
        opt_number(result.content.embedding_f1),
        opt_number(result.content.quality_score),
        result.content.source_tokens.to_string(),
        result.content.reference_tokens.to_string(),
        result.content.hypothesis_tokens.to_string(),
        number(result.content.compression_ratio),
        number(result.content.content_quality),
        opt_number(result.style_similarity),
        number(result.overall_quality),
    ]
}

fn number(value: f64) -> String {
    format!("{value:.6}")
}

fn opt_number(value: Option<f64>) -> String {
    value.map(number).unwrap_or_default()
}

fn opt_field(value: Option<&str>) -> String {
    value.map(csv_field).unwrap_or_default()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
