use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Evaluation configuration, read from a JSON file. Every section has
/// defaults so an empty `{}` config is a valid (if persona-less) run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Persona id -> persona corpus text file.
    pub personas: BTreeMap<String, PathBuf>,
    pub fields: FieldMapping,
    pub scorers: ScorerToggles,
    pub models: ModelPaths,
}

/// Dotted-path field mapping for JSONL records. Defaults match the
/// per-item JSON file layout, where these keys live at the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    pub id: String,
    pub source: String,
    pub reference: String,
    pub hypothesis: String,
    pub persona: String,
    pub sector: String,
    pub model: String,
    pub title: String,
    pub author: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            source: "document_content".to_string(),
            reference: "expected_summary".to_string(),
            hypothesis: "generated_summary".to_string(),
            persona: "persona".to_string(),
            sector: "sector".to_string(),
            model: "model".to_string(),
            title: "title".to_string(),
            author: "author".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerToggles {
    pub lexical: bool,
    pub embedding: bool,
    pub quality: bool,
    pub style: bool,
}

impl Default for ScorerToggles {
    fn default() -> Self {
        Self {
            lexical: true,
            embedding: true,
            quality: true,
            style: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    /// Local embedding model directory. When absent or unreadable the
    /// built-in registry id below is used instead.
    pub embedding_model_dir: Option<PathBuf>,
    pub embedding_model_id: String,
    /// Learned quality model checkpoint. Absent means the quality
    /// sub-score is unavailable for the whole run.
    pub quality_checkpoint: Option<PathBuf>,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            embedding_model_dir: None,
            embedding_model_id: "miniLM-L6-v2-local-v1".to_string(),
            quality_checkpoint: None,
        }
    }
}

impl EvalConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config json: {}", path.display()))?;

        Ok(config)
    }
}
