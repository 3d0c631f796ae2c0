use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CentroidsArgs;
use crate::config::EvalConfig;
use crate::style::centroid::CentroidStore;
use crate::util::ensure_directory;

pub fn run(args: CentroidsArgs) -> Result<()> {
    let config = EvalConfig::load(args.config.as_deref())?;

    if config.personas.is_empty() {
        warn!("no personas configured, centroid cache will be empty");
    }

    ensure_directory(&args.out_dir)?;
    let cache_path = args.out_dir.join("persona_centroids.json");

    let mut store = CentroidStore::new(config.personas, cache_path.clone());
    let centroids = store.build(args.force)?;

    info!(
        personas = centroids.len(),
        cache = %cache_path.display(),
        forced = args.force,
        "persona centroids ready"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("summeval-centroids-cmd-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn builds_cache_from_config() {
        let dir = scratch_dir("build");
        let corpus = dir.join("analyst.txt");
        fs::write(&corpus, "Steady growth continues.\n\nReports remain stable.").unwrap();

        let config_path = dir.join("config.json");
        fs::write(
            &config_path,
            format!(r#"{{"personas": {{"analyst": "{}"}}}}"#, corpus.display()),
        )
        .unwrap();

        let out_dir = dir.join("out");
        run(CentroidsArgs {
            config: Some(config_path),
            out_dir: out_dir.clone(),
            force: false,
        })
        .unwrap();

        assert!(out_dir.join("persona_centroids.json").exists());
    }

    #[test]
    fn force_rebuild_replaces_stale_cache() {
        let dir = scratch_dir("force");
        let corpus = dir.join("p.txt");
        fs::write(&corpus, "Original corpus text.").unwrap();

        let config_path = dir.join("config.json");
        fs::write(
            &config_path,
            format!(r#"{{"personas": {{"p": "{}"}}}}"#, corpus.display()),
        )
        .unwrap();

        let out_dir = dir.join("out");
        let args = CentroidsArgs {
            config: Some(config_path),
            out_dir: out_dir.clone(),
            force: false,
        };
        run(args.clone()).unwrap();
        let first = fs::read_to_string(out_dir.join("persona_centroids.json")).unwrap();

        fs::write(&corpus, "Entirely different words now! Much longer sentences appear here.")
            .unwrap();
        run(args.clone()).unwrap();
        let cached = fs::read_to_string(out_dir.join("persona_centroids.json")).unwrap();
        assert_eq!(first, cached, "unforced rebuild must keep the cache");

        run(CentroidsArgs { force: true, ..args }).unwrap();
        let rebuilt = fs::read_to_string(out_dir.join("persona_centroids.json")).unwrap();
        assert_ne!(first, rebuilt, "forced rebuild must re-read the corpus");
    }

    #[test]
    fn empty_persona_table_writes_empty_cache() {
        let dir = scratch_dir("empty");
        let out_dir = dir.join("out");
        run(CentroidsArgs {
            config: None,
            out_dir: out_dir.clone(),
            force: false,
        })
        .unwrap();
        assert!(out_dir.join("persona_centroids.json").exists());
    }
}
