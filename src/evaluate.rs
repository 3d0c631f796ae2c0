use anyhow::Result;

use crate::content::ContentScorer;
use crate::model::{EvaluationRecord, EvaluationResult, MissingPolicy};
use crate::style::similarity::StyleScorer;

const WEIGHT_CONTENT: f64 = 0.7;
const WEIGHT_STYLE: f64 = 0.3;

/// Score one record: content metrics against the reference, style
/// similarity against the assigned persona, and the blended
/// `overall_quality`. Missing style contributes zero to the blend.
pub fn evaluate_item(
    record: &EvaluationRecord,
    content: &mut ContentScorer,
    style: &mut StyleScorer,
) -> Result<EvaluationResult> {
    let metrics = content.score(
        &record.source_text,
        &record.reference_summary,
        &record.generated_summary,
    );

    let style_similarity = style.similarity(&record.generated_summary, record.persona.as_deref())?;

    let overall_quality = MissingPolicy::ZeroFill.weighted_sum(&[
        (WEIGHT_CONTENT, Some(metrics.content_quality)),
        (WEIGHT_STYLE, style_similarity),
    ]);

    Ok(EvaluationResult {
        record_id: record.record_id.clone(),
        source_file: record.source_file.clone(),
        title: record.title.clone(),
        author: record.author.clone(),
        sector: record.sector.clone(),
        model: record.model.clone(),
        persona: record.persona.clone(),
        content: metrics,
        style_similarity,
        overall_quality,
    })
}
