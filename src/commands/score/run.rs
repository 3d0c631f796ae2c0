use std::collections::HashMap;

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ScoreArgs;
use crate::config::EvalConfig;
use crate::content::ContentScorer;
use crate::evaluate::evaluate_item;
use crate::model::{RUN_MANIFEST_VERSION, RunCounts, RunManifest, RunPaths};
use crate::records::{self, RecordSource};
use crate::stats;
use crate::style::centroid::CentroidStore;
use crate::style::similarity::StyleScorer;
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

use super::output;

pub fn run(args: ScoreArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let source = match (&args.data_dir, &args.records) {
        (Some(dir), None) => RecordSource::JsonDir(dir.clone()),
        (None, Some(path)) => RecordSource::Jsonl(path.clone()),
        (Some(_), Some(_)) => bail!("--data-dir and --records are mutually exclusive"),
        (None, None) => bail!("one of --data-dir or --records is required"),
    };

    let source_path = match &source {
        RecordSource::JsonDir(dir) => dir,
        RecordSource::Jsonl(path) => path,
    };
    if !source_path.exists() {
        bail!("data source not found: {}", source_path.display());
    }

    let config = EvalConfig::load(args.config.as_deref())?;
    let config_source = args.config.as_ref().map(|p| p.display().to_string());
    let config_sha256 = match &args.config {
        Some(path) => Some(sha256_file(path)?),
        None => None,
    };

    ensure_directory(&args.out_dir)?;

    let assignments = match &args.assignments {
        Some(path) => records::load_persona_assignments(path)?,
        None => HashMap::new(),
    };

    info!(
        run_id = %run_id,
        source = %source_path.display(),
        out_dir = %args.out_dir.display(),
        "starting evaluation run"
    );

    let outcome = records::load_records(&source, &config.fields, &assignments)?;
    let records_loaded = outcome.records.len();
    if records_loaded == 0 {
        bail!("no usable records loaded from {}", source_path.display());
    }

    let mut items = outcome.records;
    if let Some(max_items) = args.max_items {
        if max_items < items.len() {
            info!(max_items, loaded = items.len(), "truncating to max items");
            items.truncate(max_items);
        }
    }

    let centroid_cache_path = args.out_dir.join("persona_centroids.json");
    let mut store = CentroidStore::new(config.personas.clone(), centroid_cache_path.clone());
    let centroids_built = store.build(args.force_rebuild_centroids)?.len();
    if config.scorers.style && centroids_built == 0 && !config.personas.is_empty() {
        warn!("no persona centroids available, style similarity will be missing");
    }

    let mut content = ContentScorer::new(&config);
    let mut style = StyleScorer::new(config.scorers.style, store);

    let mut results = Vec::with_capacity(items.len());
    let mut warnings = Vec::new();
    for record in &items {
        match evaluate_item(record, &mut content, &mut style) {
            Ok(result) => results.push(result),
            Err(err) => {
                warn!(record = %record.record_id, error = %err, "item evaluation failed, skipping");
                warnings.push(format!("item {} failed: {err}", record.record_id));
            }
        }
    }

    let metrics_csv_path = args.out_dir.join("per_item_metrics.csv");
    output::write_metrics_csv(&metrics_csv_path, &results)?;
    info!(path = %metrics_csv_path.display(), rows = results.len(), "wrote per-item metrics");

    let aggregates = stats::aggregate(&results);
    let aggregates_path = args.out_dir.join("corpus_aggregates.json");
    write_json_pretty(&aggregates_path, &aggregates)?;
    info!(path = %aggregates_path.display(), "wrote corpus aggregates");

    let manifest = RunManifest {
        manifest_version: RUN_MANIFEST_VERSION,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        completed_at: now_utc_string(),
        command: "score".to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        config_source,
        config_sha256,
        paths: RunPaths {
            out_dir: args.out_dir.display().to_string(),
            centroid_cache_path: centroid_cache_path.display().to_string(),
            metrics_csv_path: metrics_csv_path.display().to_string(),
            aggregates_path: aggregates_path.display().to_string(),
        },
        counts: RunCounts {
            records_seen: outcome.seen,
            records_loaded,
            records_skipped: outcome.skipped,
            items_evaluated: results.len(),
            personas_configured: config.personas.len(),
            centroids_built,
            style_scored: results.iter().filter(|r| r.style_similarity.is_some()).count(),
            embedding_scored: results
                .iter()
                .filter(|r| r.content.embedding_f1.is_some())
                .count(),
            quality_scored: results
                .iter()
                .filter(|r| r.content.quality_score.is_some())
                .count(),
        },
        warnings,
    };

    let manifest_path = args.out_dir.join("run_manifest.json");
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote run manifest");

    info!(run_id = %run_id, items = results.len(), "evaluation run complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::model::RunManifest;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("summeval-score-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_record(dir: &PathBuf, name: &str, id: &str, persona: Option<&str>) {
        let persona_field = match persona {
            Some(p) => format!(r#", "persona": "{p}""#),
            None => String::new(),
        };
        let body = format!(
            r#"{{"id": "{id}",
                "document_content": "The quarterly report shows steady growth across sectors.",
                "expected_summary": "The report shows steady growth.",
                "generated_summary": "Steady growth is shown in the report.",
                "sector": "finance", "model": "model-a"{persona_field}}}"#
        );
        fs::write(dir.join(name), body).unwrap();
    }

    fn lexical_only_config(dir: &PathBuf) -> PathBuf {
        let path = dir.join("config.json");
        fs::write(
            &path,
            r#"{"scorers": {"embedding": false, "quality": false}}"#,
        )
        .unwrap();
        path
    }

    fn score_args(data_dir: PathBuf, config: PathBuf, out_dir: PathBuf) -> ScoreArgs {
        ScoreArgs {
            data_dir: Some(data_dir),
            records: None,
            config: Some(config),
            out_dir,
            assignments: None,
            force_rebuild_centroids: false,
            max_items: None,
        }
    }

    #[test]
    fn score_run_writes_all_artifacts() {
        let dir = scratch_dir("artifacts");
        let data_dir = dir.join("data");
        fs::create_dir_all(&data_dir).unwrap();
        write_record(&data_dir, "one.json", "w1", None);
        write_record(&data_dir, "two.json", "w2", None);
        let config = lexical_only_config(&dir);
        let out_dir = dir.join("out");

        run(score_args(data_dir, config, out_dir.clone())).unwrap();

        assert!(out_dir.join("per_item_metrics.csv").exists());
        assert!(out_dir.join("corpus_aggregates.json").exists());
        assert!(out_dir.join("run_manifest.json").exists());
        assert!(out_dir.join("persona_centroids.json").exists());

        let manifest: RunManifest =
            serde_json::from_str(&fs::read_to_string(out_dir.join("run_manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest.status, "completed");
        assert_eq!(manifest.command, "score");
        assert_eq!(manifest.counts.records_loaded, 2);
        assert_eq!(manifest.counts.items_evaluated, 2);
        assert_eq!(manifest.counts.style_scored, 0);
    }

    #[test]
    fn empty_data_source_is_fatal() {
        let dir = scratch_dir("empty-source");
        let data_dir = dir.join("data");
        fs::create_dir_all(&data_dir).unwrap();
        let config = lexical_only_config(&dir);

        let err = run(score_args(data_dir, config, dir.join("out"))).unwrap_err();
        assert!(err.to_string().contains("no usable records"));
    }

    #[test]
    fn missing_data_source_is_fatal() {
        let dir = scratch_dir("missing-source");
        let config = lexical_only_config(&dir);

        let err = run(score_args(dir.join("nope"), config, dir.join("out"))).unwrap_err();
        assert!(err.to_string().contains("data source not found"));
    }

    #[test]
    fn both_sources_rejected() {
        let dir = scratch_dir("both-sources");
        let config = lexical_only_config(&dir);

        let args = ScoreArgs {
            data_dir: Some(dir.clone()),
            records: Some(dir.join("records.jsonl")),
            config: Some(config),
            out_dir: dir.join("out"),
            assignments: None,
            force_rebuild_centroids: false,
            max_items: None,
        };
        assert!(run(args).is_err());
    }

    #[test]
    fn max_items_truncates_evaluation() {
        let dir = scratch_dir("max-items");
        let data_dir = dir.join("data");
        fs::create_dir_all(&data_dir).unwrap();
        write_record(&data_dir, "a.json", "w1", None);
        write_record(&data_dir, "b.json", "w2", None);
        write_record(&data_dir, "c.json", "w3", None);
        let config = lexical_only_config(&dir);
        let out_dir = dir.join("out");

        let mut args = score_args(data_dir, config, out_dir.clone());
        args.max_items = Some(2);
        run(args).unwrap();

        let manifest: RunManifest =
            serde_json::from_str(&fs::read_to_string(out_dir.join("run_manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest.counts.records_loaded, 3);
        assert_eq!(manifest.counts.items_evaluated, 2);
    }

    #[test]
    fn persona_pipeline_scores_style() {
        let dir = scratch_dir("persona");
        let data_dir = dir.join("data");
        fs::create_dir_all(&data_dir).unwrap();
        write_record(&data_dir, "a.json", "w1", Some("analyst"));

        let corpus = dir.join("analyst.txt");
        fs::write(
            &corpus,
            "Growth remains steady. Reports are consistent.\n\nWe observe stable results.",
        )
        .unwrap();
        let config_path = dir.join("config.json");
        fs::write(
            &config_path,
            format!(
                r#"{{"personas": {{"analyst": "{}"}},
                    "scorers": {{"embedding": false, "quality": false}}}}"#,
                corpus.display()
            ),
        )
        .unwrap();
        let out_dir = dir.join("out");

        run(score_args(data_dir, config_path, out_dir.clone())).unwrap();

        let manifest: RunManifest =
            serde_json::from_str(&fs::read_to_string(out_dir.join("run_manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest.counts.personas_configured, 1);
        assert_eq!(manifest.counts.centroids_built, 1);
        assert_eq!(manifest.counts.style_scored, 1);
    }
}
