use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::style::features::{self, FeatureVector, FEATURE_DIMS, FEATURE_SCHEMA};
use crate::util::{sha256_hex, write_json_pretty};

pub const CENTROID_SCHEMA_VERSION: u32 = 1;

/// Hash of the feature schema (names + normalization constants, in order).
/// A cache written under a different extraction schema must not be loaded.
pub fn feature_schema_hash() -> String {
    sha256_hex(&FEATURE_SCHEMA.join("\n"))
}

#[derive(Debug, Serialize, Deserialize)]
struct CentroidCache {
    schema_version: u32,
    feature_hash: String,
    centroids: BTreeMap<String, Vec<f64>>,
}

/// Builds and caches one mean feature vector per persona.
///
/// Without a forced rebuild, a readable cache with a matching schema tag is
/// loaded verbatim and corpora are not re-read; corpus edits are picked up
/// only on force-rebuild or after deleting the cache file.
#[derive(Debug)]
pub struct CentroidStore {
    personas: BTreeMap<String, PathBuf>,
    cache_path: PathBuf,
    centroids: Option<BTreeMap<String, FeatureVector>>,
}

impl CentroidStore {
    pub fn new(personas: BTreeMap<String, PathBuf>, cache_path: PathBuf) -> Self {
        Self {
            personas,
            cache_path,
            centroids: None,
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Centroid for one persona, building the store on first use.
    pub fn get(&mut self, persona_id: &str) -> Result<Option<FeatureVector>> {
        if self.centroids.is_none() {
            self.build(false)?;
        }

        Ok(self
            .centroids
            .as_ref()
            .and_then(|map| map.get(persona_id))
            .copied())
    }

    pub fn build(&mut self, force_rebuild: bool) -> Result<&BTreeMap<String, FeatureVector>> {
        if !force_rebuild {
            if let Some(cached) = self.try_load_cache() {
                info!(
                    personas = cached.len(),
                    cache = %self.cache_path.display(),
                    "loaded persona centroids from cache"
                );
                self.centroids = Some(cached);
                return Ok(self.centroids.as_ref().unwrap());
            }
        }

        let mut centroids = BTreeMap::new();

        for (persona_id, corpus_path) in &self.personas {
            let corpus_text = match fs::read_to_string(corpus_path) {
                Ok(text) => text,
                Err(err) => {
                    warn!(
                        persona = %persona_id,
                        corpus = %corpus_path.display(),
                        error = %err,
                        "persona corpus not readable, skipping"
                    );
                    continue;
                }
            };

            let samples = split_samples(&corpus_text);
            if samples.is_empty() {
                warn!(persona = %persona_id, "persona corpus has no samples, skipping");
                continue;
            }

            let vectors: Vec<FeatureVector> =
                samples.iter().map(|s| features::extract(s)).collect();
            let centroid = mean_centroid(&vectors);

            debug!(persona = %persona_id, samples = samples.len(), "built persona centroid");
            centroids.insert(persona_id.clone(), centroid);
        }

        self.write_cache(&centroids)?;
        self.centroids = Some(centroids);

        Ok(self.centroids.as_ref().unwrap())
    }

    fn try_load_cache(&self) -> Option<BTreeMap<String, FeatureVector>> {
        let data = fs::read_to_string(&self.cache_path).ok()?;

        let cache: CentroidCache = match serde_json::from_str(&data) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(
                    cache = %self.cache_path.display(),
                    error = %err,
                    "centroid cache unreadable, rebuilding"
                );
                return None;
            }
        };

        if cache.schema_version != CENTROID_SCHEMA_VERSION
            || cache.feature_hash != feature_schema_hash()
        {
            warn!(
                cache = %self.cache_path.display(),
                cached_version = cache.schema_version,
                "centroid cache schema tag mismatch, rebuilding"
            );
            return None;
        }

        let mut centroids = BTreeMap::new();
        for (persona_id, values) in cache.centroids {
            let vector: FeatureVector = match values.try_into() {
                Ok(vector) => vector,
                Err(_) => {
                    warn!(
                        cache = %self.cache_path.display(),
                        persona = %persona_id,
                        "cached centroid has wrong dimension count, rebuilding"
                    );
                    return None;
                }
            };
            centroids.insert(persona_id, vector);
        }

        Some(centroids)
    }

    fn write_cache(&self, centroids: &BTreeMap<String, FeatureVector>) -> Result<()> {
        let cache = CentroidCache {
            schema_version: CENTROID_SCHEMA_VERSION,
            feature_hash: feature_schema_hash(),
            centroids: centroids
                .iter()
                .map(|(id, vector)| (id.clone(), vector.to_vec()))
                .collect(),
        };

        write_json_pretty(&self.cache_path, &cache)
            .with_context(|| format!("failed to write centroid cache: {}", self.cache_path.display()))
    }
}

/// Split a persona corpus into samples on blank-line boundaries.
pub fn split_samples(corpus_text: &str) -> Vec<String> {
    corpus_text
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Elementwise arithmetic mean. Returns the zero vector for empty input.
pub fn mean_centroid(vectors: &[FeatureVector]) -> FeatureVector {
    let mut mean = [0.0; FEATURE_DIMS];
    if vectors.is_empty() {
        return mean;
    }

    for vector in vectors {
        for (acc, value) in mean.iter_mut().zip(vector.iter()) {
            *acc += value;
        }
    }
    for acc in mean.iter_mut() {
        *acc /= vectors.len() as f64;
    }

    mean
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("summeval-centroid-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_corpus(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn split_samples_on_blank_lines() {
        let samples = split_samples("First sample text.\n\nSecond sample here.\n\n\n");
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], "First sample text.");
    }

    #[test]
    fn split_samples_normalizes_crlf() {
        let samples = split_samples("one\r\n\r\ntwo");
        assert_eq!(samples, vec!["one", "two"]);
    }

    #[test]
    fn mean_centroid_averages_elementwise() {
        let a: FeatureVector = [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let b: FeatureVector = [3.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mean = mean_centroid(&[a, b]);
        assert_eq!(mean[0], 2.0);
        assert_eq!(mean[1], 2.0);
        assert_eq!(mean[2], 2.0);
    }

    #[test]
    fn mean_centroid_empty_is_zero() {
        assert_eq!(mean_centroid(&[]), [0.0; FEATURE_DIMS]);
    }

    #[test]
    fn build_writes_tagged_cache_and_is_idempotent() {
        let dir = scratch_dir("idempotent");
        let corpus = write_corpus(&dir, "analyst.txt", "The report is thorough.\n\nWe see growth.");
        let cache_path = dir.join("persona_centroids.json");

        let mut personas = BTreeMap::new();
        personas.insert("analyst".to_string(), corpus);

        let mut store = CentroidStore::new(personas.clone(), cache_path.clone());
        let first = store.build(false).unwrap().clone();
        assert!(cache_path.exists());
        assert_eq!(first.len(), 1);

        let raw = fs::read_to_string(&cache_path).unwrap();
        let cache: CentroidCache = serde_json::from_str(&raw).unwrap();
        assert_eq!(cache.schema_version, CENTROID_SCHEMA_VERSION);
        assert_eq!(cache.feature_hash, feature_schema_hash());

        let mut second_store = CentroidStore::new(personas, cache_path);
        let second = second_store.build(false).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn schema_tag_mismatch_forces_rebuild() {
        let dir = scratch_dir("schema-mismatch");
        let corpus = write_corpus(&dir, "writer.txt", "Plain words here.");
        let cache_path = dir.join("persona_centroids.json");

        let stale = CentroidCache {
            schema_version: CENTROID_SCHEMA_VERSION,
            feature_hash: "0000".to_string(),
            centroids: BTreeMap::from([("writer".to_string(), vec![9.0; FEATURE_DIMS])]),
        };
        write_json_pretty(&cache_path, &stale).unwrap();

        let mut personas = BTreeMap::new();
        personas.insert("writer".to_string(), corpus);

        let mut store = CentroidStore::new(personas, cache_path);
        let built = store.build(false).unwrap();
        let centroid = built.get("writer").unwrap();
        assert!(centroid[0] < 9.0, "stale cache value must not survive");
    }

    #[test]
    fn missing_corpus_is_skipped_not_fatal() {
        let dir = scratch_dir("missing-corpus");
        let cache_path = dir.join("persona_centroids.json");

        let mut personas = BTreeMap::new();
        personas.insert("ghost".to_string(), dir.join("nope.txt"));

        let mut store = CentroidStore::new(personas, cache_path);
        let built = store.build(true).unwrap();
        assert!(built.is_empty());
    }

    #[test]
    fn empty_corpus_is_skipped() {
        let dir = scratch_dir("empty-corpus");
        let corpus = write_corpus(&dir, "empty.txt", "   \n\n  \n");
        let cache_path = dir.join("persona_centroids.json");

        let mut personas = BTreeMap::new();
        personas.insert("empty".to_string(), corpus);

        let mut store = CentroidStore::new(personas, cache_path);
        let built = store.build(true).unwrap();
        assert!(built.is_empty());
    }

    #[test]
    fn get_builds_on_demand() {
        let dir = scratch_dir("on-demand");
        let corpus = write_corpus(&dir, "p.txt", "Some sample text for the persona.");
        let cache_path = dir.join("persona_centroids.json");

        let mut personas = BTreeMap::new();
        personas.insert("p".to_string(), corpus);

        let mut store = CentroidStore::new(personas, cache_path);
        assert!(store.get("p").unwrap().is_some());
        assert!(store.get("unknown").unwrap().is_none());
    }
}
