use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::info;

use crate::cli::ReportArgs;
use crate::util::ensure_directory;

const CONTENT_METRICS: &[&str] = &[
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
];

const STYLE_METRICS: &[&str] = &["style_similarity"];

const COMPOSITE_METRICS: &[&str] = &["overall_quality"];

const GROUP_METRICS: &[&str] = &[
    "rouge_l_f",
    "embedding_f1",
    "quality_score",
    "content_quality",
    "style_similarity",
    "overall_quality",
];

pub fn run(args: ReportArgs) -> Result<()> {
    let metrics_csv_path = args.out_dir.join("per_item_metrics.csv");
    let aggregates_path = args.out_dir.join("corpus_aggregates.json");

    let csv_text = fs::read_to_string(&metrics_csv_path)
        .with_context(|| format!("failed to read {}", metrics_csv_path.display()))?;
    let aggregates_text = fs::read_to_string(&aggregates_path)
        .with_context(|| format!("failed to read {}", aggregates_path.display()))?;
    let aggregates: Value = serde_json::from_str(&aggregates_text)
        .with_context(|| format!("failed to parse {}", aggregates_path.display()))?;

    let items = parse_items(&csv_text)
        .with_context(|| format!("failed to parse {}", metrics_csv_path.display()))?;

    let report = render_report(&items, &aggregates, args.top_n);

    let report_path = args
        .report_path
        .unwrap_or_else(|| args.out_dir.join("report.md"));
    if let Some(parent) = report_path.parent() {
        ensure_directory(parent)?;
    }
    fs::write(&report_path, report)
        .with_context(|| format!("failed to write {}", report_path.display()))?;

    info!(path = %report_path.display(), items = items.len(), "wrote evaluation report");
    Ok(())
}

/// The per-item columns the report actually renders.
#[derive(Debug, Clone)]
struct ItemRow {
    record_id: String,
    title: String,
    persona: String,
    rouge_l_f: Option<f64>,
    embedding_f1: Option<f64>,
    content_quality: Option<f64>,
    style_similarity: Option<f64>,
}

fn parse_items(csv_text: &str) -> Result<Vec<ItemRow>> {
    let rows = parse_csv(csv_text);
    let Some((header, data)) = rows.split_first() else {
        return Ok(Vec::new());
    };

    let column = |name: &str| -> Result<usize> {
        header
            .iter()
            .position(|c| c == name)
            .with_context(|| format!("metrics csv missing column: {name}"))
    };

    let record_id = column("record_id")?;
    let title = column("title")?;
    let persona = column("persona")?;
    let rouge_l_f = column("rouge_l_f")?;
    let embedding_f1 = column("embedding_f1")?;
    let content_quality = column("content_quality")?;
    let style_similarity = column("style_similarity")?;

    let cell = |row: &[String], index: usize| row.get(index).cloned().unwrap_or_default();
    let numeric =
        |row: &[String], index: usize| row.get(index).and_then(|c| c.parse::<f64>().ok());

    Ok(data
        .iter()
        .map(|row| ItemRow {
            record_id: cell(row, record_id),
            title: cell(row, title),
            persona: cell(row, persona),
            rouge_l_f: numeric(row, rouge_l_f),
            embedding_f1: numeric(row, embedding_f1),
            content_quality: numeric(row, content_quality),
            style_similarity: numeric(row, style_similarity),
        })
        .collect())
}

/// Minimal CSV reader for our own output format: quoted cells may contain
/// commas, doubled quotes, and line breaks.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut cell)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
            }
            _ => cell.push(c),
        }
    }

    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }

    rows
}

fn render_report(items: &[ItemRow], aggregates: &Value, top_n: usize) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("# Summary Evaluation Report".to_string());
    lines.push(String::new());

    let total = aggregates
        .get("total_items")
        .and_then(Value::as_u64)
        .unwrap_or(items.len() as u64);
    lines.push(format!("**Total items evaluated:** {total}"));
    lines.push(String::new());

    lines.push("## Overall Statistics".to_string());
    lines.push(String::new());
    let overall = aggregates.get("overall");
    push_metric_table(&mut lines, overall, CONTENT_METRICS, "Content Quality Metrics");
    push_metric_table(&mut lines, overall, STYLE_METRICS, "Style Fidelity Metrics");
    push_metric_table(&mut lines, overall, COMPOSITE_METRICS, "Composite Quality");

    push_group_section(&mut lines, aggregates.get("by_persona"), "Per-Persona Results", "Persona");
    push_group_section(&mut lines, aggregates.get("by_model"), "Per-Model Results", "Model");

    push_performance_analysis(&mut lines, items, top_n);
    push_summary(&mut lines, items);

    lines.join("\n")
}

fn push_metric_table(
    lines: &mut Vec<String>,
    group: Option<&Value>,
    metrics: &[&str],
    title: &str,
) {
    lines.push(format!("### {title}"));
    lines.push(String::new());

    let present: Vec<(&str, &Map<String, Value>)> = group
        .and_then(Value::as_object)
        .map(|group| {
            metrics
                .iter()
                .filter_map(|m| group.get(*m).and_then(Value::as_object).map(|s| (*m, s)))
                .collect()
        })
        .unwrap_or_default();

    if present.is_empty() {
        lines.push("No data available.".to_string());
        lines.push(String::new());
        return;
    }

    lines.push("| Metric | Mean | Median | Std Dev | Min | Max | Count |".to_string());
    lines.push("|--------|------|--------|---------|-----|-----|-------|".to_string());
    for (name, stats) in present {
        lines.push(format!(
            "| {name} | {} | {} | {} | {} | {} | {} |",
            stat(stats, "mean"),
            stat(stats, "median"),
            stat(stats, "std"),
            stat(stats, "min"),
            stat(stats, "max"),
            stats.get("count").and_then(Value::as_u64).unwrap_or(0),
        ));
    }
    lines.push(String::new());
}

fn push_group_section(
    lines: &mut Vec<String>,
    groups: Option<&Value>,
    section_title: &str,
    group_label: &str,
) {
    let Some(groups) = groups.and_then(Value::as_object) else {
        return;
    };
    if groups.is_empty() {
        return;
    }

    lines.push(format!("## {section_title}"));
    lines.push(String::new());
    for (group_key, group) in groups {
        push_metric_table(
            lines,
            Some(group),
            GROUP_METRICS,
            &format!("{group_label}: {group_key}"),
        );
    }
}

fn push_performance_analysis(lines: &mut Vec<String>, items: &[ItemRow], top_n: usize) {
    lines.push("## Performance Analysis".to_string());
    lines.push(String::new());

    let mut by_content: Vec<&ItemRow> =
        items.iter().filter(|i| i.content_quality.is_some()).collect();
    by_content.sort_by(|a, b| {
        b.content_quality
            .partial_cmp(&a.content_quality)
            .expect("content quality values are finite")
    });

    if !by_content.is_empty() {
        push_item_table(
            lines,
            &format!("Top {top_n} by Content Quality"),
            by_content.iter().take(top_n).copied(),
            content_columns,
        );
        push_item_table(
            lines,
            &format!("Bottom {top_n} by Content Quality"),
            by_content.iter().rev().take(top_n).copied(),
            content_columns,
        );
    }

    let mut by_style: Vec<&ItemRow> =
        items.iter().filter(|i| i.style_similarity.is_some()).collect();
    by_style.sort_by(|a, b| {
        b.style_similarity
            .partial_cmp(&a.style_similarity)
            .expect("style similarity values are finite")
    });

    if !by_style.is_empty() {
        push_item_table(
            lines,
            &format!("Top {top_n} by Style Similarity"),
            by_style.iter().take(top_n).copied(),
            style_columns,
        );
        push_item_table(
            lines,
            &format!("Bottom {top_n} by Style Similarity"),
            by_style.iter().rev().take(top_n).copied(),
            style_columns,
        );
    }
}

fn content_columns() -> (&'static str, fn(&ItemRow) -> String) {
    (
        "| Record | Title | Content Quality | ROUGE-L F | Embedding F1 |",
        |item| {
            format!(
                "| {} | {} | {} | {} | {} |",
                item.record_id,
                item.title,
                fmt_opt(item.content_quality),
                fmt_opt(item.rouge_l_f),
                fmt_opt(item.embedding_f1),
            )
        },
    )
}

fn style_columns() -> (&'static str, fn(&ItemRow) -> String) {
    (
        "| Record | Title | Persona | Style Similarity |",
        |item| {
            format!(
                "| {} | {} | {} | {} |",
                item.record_id,
                item.title,
                item.persona,
                fmt_opt(item.style_similarity),
            )
        },
    )
}

fn push_item_table<'a>(
    lines: &mut Vec<String>,
    title: &str,
    items: impl Iterator<Item = &'a ItemRow>,
    columns: fn() -> (&'static str, fn(&ItemRow) -> String),
) {
    let (header, render_row) = columns();

    lines.push(format!("### {title}"));
    lines.push(String::new());
    lines.push(header.to_string());
    lines.push(separator_for(header));
    for item in items {
        lines.push(render_row(item));
    }
    lines.push(String::new());
}

fn separator_for(header: &str) -> String {
    let columns = header.matches('|').count().saturating_sub(1);
    let mut separator = String::from("|");
    for _ in 0..columns {
        separator.push_str("---|");
    }
    separator
}

fn push_summary(lines: &mut Vec<String>, items: &[ItemRow]) {
    let style_scored = items.iter().filter(|i| i.style_similarity.is_some()).count();

    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- Items with style evaluation: {style_scored} / {}",
        items.len()
    ));
    lines.push(format!(
        "- Items without style evaluation: {}",
        items.len() - style_scored
    ));

    if let Some(avg) = mean(items.iter().filter_map(|i| i.content_quality)) {
        lines.push(format!("- Average content quality: {avg:.4}"));
    }
    if let Some(avg) = mean(items.iter().filter_map(|i| i.style_similarity)) {
        lines.push(format!("- Average style similarity: {avg:.4}"));
    }
    lines.push(String::new());
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn stat(stats: &Map<String, Value>, key: &str) -> String {
    match stats.get(key).and_then(Value::as_f64) {
        Some(value) => format!("{value:.4}"),
        None => "n/a".to_string(),
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}
