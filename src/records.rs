use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::FieldMapping;
use crate::model::EvaluationRecord;

/// Where evaluation records come from: a directory of per-item JSON files
/// or a single JSONL file. Both feed the same pipeline through the field
/// mapping in the config.
#[derive(Debug, Clone)]
pub enum RecordSource {
    JsonDir(PathBuf),
    Jsonl(PathBuf),
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: Vec<EvaluationRecord>,
    pub seen: usize,
    pub skipped: usize,
}

pub fn load_records(
    source: &RecordSource,
    fields: &FieldMapping,
    assignments: &HashMap<String, String>,
) -> Result<LoadOutcome> {
    match source {
        RecordSource::JsonDir(dir) => load_json_dir(dir, fields, assignments),
        RecordSource::Jsonl(path) => load_jsonl(path, fields, assignments),
    }
}

fn load_json_dir(
    dir: &Path,
    fields: &FieldMapping,
    assignments: &HashMap<String, String>,
) -> Result<LoadOutcome> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read data directory: {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut outcome = LoadOutcome::default();

    for path in paths {
        outcome.seen += 1;

        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "unreadable record file, skipping");
                outcome.skipped += 1;
                continue;
            }
        };

        let value: Value = match serde_json::from_str(&data) {
            Ok(value) => value,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "malformed record file, skipping");
                outcome.skipped += 1;
                continue;
            }
        };

        let fallback_id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("record-{}", outcome.seen));
        let source_file = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string());

        match build_record(&value, fields, assignments, fallback_id, source_file) {
            Some(record) => outcome.records.push(record),
            None => {
                warn!(file = %path.display(), "record missing required text fields, skipping");
                outcome.skipped += 1;
            }
        }
    }

    debug!(
        loaded = outcome.records.len(),
        skipped = outcome.skipped,
        dir = %dir.display(),
        "loaded json record directory"
    );

    Ok(outcome)
}

fn load_jsonl(
    path: &Path,
    fields: &FieldMapping,
    assignments: &HashMap<String, String>,
) -> Result<LoadOutcome> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read records file: {}", path.display()))?;

    let mut outcome = LoadOutcome::default();

    for (line_index, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        outcome.seen += 1;

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!(line = line_index + 1, error = %err, "malformed jsonl record, skipping");
                outcome.skipped += 1;
                continue;
            }
        };

        let fallback_id = format!("line-{}", line_index + 1);
        match build_record(&value, fields, assignments, fallback_id, None) {
            Some(record) => outcome.records.push(record),
            None => {
                warn!(line = line_index + 1, "record missing required text fields, skipping");
                outcome.skipped += 1;
            }
        }
    }

    Ok(outcome)
}

fn build_record(
    value: &Value,
    fields: &FieldMapping,
    assignments: &HashMap<String, String>,
    fallback_id: String,
    source_file: Option<String>,
) -> Option<EvaluationRecord> {
    let source_text = field_string(value, &fields.source)?;
    let reference_summary = field_string(value, &fields.reference)?;
    let generated_summary = field_string(value, &fields.hypothesis)?;

    if reference_summary.trim().is_empty() || generated_summary.trim().is_empty() {
        return None;
    }

    let record_id = field_string(value, &fields.id).unwrap_or(fallback_id);

    let persona = field_string(value, &fields.persona)
        .filter(|p| !p.trim().is_empty())
        .or_else(|| assignments.get(&record_id).cloned());

    Some(EvaluationRecord {
        record_id,
        source_file,
        title: field_string(value, &fields.title),
        author: field_string(value, &fields.author),
        sector: field_string(value, &fields.sector),
        model: field_string(value, &fields.model),
        persona,
        source_text,
        reference_summary,
        generated_summary,
    })
}

/// Resolve a dotted path ("metadata.author") against a JSON value.
fn get_field<'a>(value: &'a Value, dotted_path: &str) -> Option<&'a Value> {
    let mut current = value;
    for key in dotted_path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

fn field_string(value: &Value, dotted_path: &str) -> Option<String> {
    match get_field(value, dotted_path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Persona assignment table: a CSV with `write_id` and `persona_id`
/// columns. A missing file is an empty table, not an error.
pub fn load_persona_assignments(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        warn!(path = %path.display(), "persona assignments file not found, using empty table");
        return Ok(HashMap::new());
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read persona assignments: {}", path.display()))?;

    let mut lines = data.lines();
    let header = lines.next().unwrap_or("");
    let columns: Vec<&str> = header.split(',').map(|c| c.trim()).collect();
    let write_id_col = columns.iter().position(|c| *c == "write_id");
    let persona_col = columns.iter().position(|c| *c == "persona_id");

    let (Some(write_id_col), Some(persona_col)) = (write_id_col, persona_col) else {
        warn!(path = %path.display(), "assignments csv missing write_id/persona_id columns");
        return Ok(HashMap::new());
    };

    let mut assignments = HashMap::new();
    for line in lines {
        let cells: Vec<&str> = line.split(',').map(|c| c.trim()).collect();
        let write_id = cells.get(write_id_col).copied().unwrap_or("");
        let persona_id = cells.get(persona_col).copied().unwrap_or("");
        if !write_id.is_empty() && !persona_id.is_empty() {
            assignments.insert(write_id.to_string(), persona_id.to_string());
        }
    }

    Ok(assignments)
}
