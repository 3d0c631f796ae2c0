use std::fs;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::config::EvalConfig;
use crate::model::RunManifest;
use crate::style::centroid::feature_schema_hash;

pub fn run(args: StatusArgs) -> Result<()> {
    let centroid_cache_path = args.out_dir.join("persona_centroids.json");
    let manifest_path = args.out_dir.join("run_manifest.json");
    let metrics_csv_path = args.out_dir.join("per_item_metrics.csv");
    let aggregates_path = args.out_dir.join("corpus_aggregates.json");
    let report_path = args.out_dir.join("report.md");

    info!(out_dir = %args.out_dir.display(), "status requested");

    if let Some(config_path) = &args.config {
        let config = EvalConfig::load(Some(config_path))?;
        info!(
            config = %config_path.display(),
            personas = config.personas.len(),
            lexical = config.scorers.lexical,
            embedding = config.scorers.embedding,
            quality = config.scorers.quality,
            style = config.scorers.style,
            "loaded evaluation config"
        );
    }

    if centroid_cache_path.exists() {
        let raw = fs::read_to_string(&centroid_cache_path)
            .with_context(|| format!("failed to read {}", centroid_cache_path.display()))?;
        let cache: Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", centroid_cache_path.display()))?;

        let schema_version = cache.get("schema_version").and_then(Value::as_u64).unwrap_or(0);
        let feature_hash = cache
            .get("feature_hash")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let personas = cache
            .get("centroids")
            .and_then(Value::as_object)
            .map(|c| c.len())
            .unwrap_or(0);
        let current = feature_hash == feature_schema_hash();

        info!(
            path = %centroid_cache_path.display(),
            schema_version,
            personas,
            current,
            "centroid cache status"
        );
        if !current {
            warn!(
                path = %centroid_cache_path.display(),
                "centroid cache was written under a different feature schema"
            );
        }
    } else {
        warn!(path = %centroid_cache_path.display(), "centroid cache missing");
    }

    if manifest_path.exists() {
        let raw = fs::read_to_string(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        let manifest: RunManifest = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

        info!(
            run_id = %manifest.run_id,
            status = %manifest.status,
            completed_at = %manifest.completed_at,
            items_evaluated = manifest.counts.items_evaluated,
            records_skipped = manifest.counts.records_skipped,
            style_scored = manifest.counts.style_scored,
            warnings = manifest.warnings.len(),
            "loaded run manifest"
        );
    } else {
        warn!(path = %manifest_path.display(), "run manifest missing");
    }

    if metrics_csv_path.exists() {
        let raw = fs::read_to_string(&metrics_csv_path)
            .with_context(|| format!("failed to read {}", metrics_csv_path.display()))?;
        let rows = raw.lines().count().saturating_sub(1);
        info!(path = %metrics_csv_path.display(), rows, "per-item metrics status");
    } else {
        warn!(path = %metrics_csv_path.display(), "per-item metrics missing");
    }

    if aggregates_path.exists() {
        let raw = fs::read_to_string(&aggregates_path)
            .with_context(|| format!("failed to read {}", aggregates_path.display()))?;
        let aggregates: Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", aggregates_path.display()))?;
        let total_items = aggregates
            .get("total_items")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        info!(path = %aggregates_path.display(), total_items, "aggregates status");
    } else {
        warn!(path = %aggregates_path.display(), "aggregates missing");
    }

    if report_path.exists() {
        info!(path = %report_path.display(), "report present");
    } else {
        info!(path = %report_path.display(), "report not rendered");
    }

    Ok(())
}
