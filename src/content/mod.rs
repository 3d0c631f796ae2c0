pub mod embedding;
pub mod lexical;
pub mod quality;

use crate::config::EvalConfig;
use crate::model::{ContentMetrics, MissingPolicy};
use crate::textproc;

use embedding::EmbeddingScorer;
use quality::QualityModel;

const WEIGHT_LEXICAL: f64 = 0.4;
const WEIGHT_EMBEDDING: f64 = 0.3;
const WEIGHT_QUALITY: f64 = 0.3;

/// Orchestrates the content-side sub-scorers and blends them into one
/// `content_quality` value. Missing sub-scores contribute zero to the
/// blend (`MissingPolicy::ZeroFill`); they stay `None` in the metrics so
/// aggregation can exclude them.
#[derive(Debug)]
pub struct ContentScorer {
    lexical_enabled: bool,
    embedding: EmbeddingScorer,
    quality: QualityModel,
}

impl ContentScorer {
    pub fn new(config: &EvalConfig) -> Self {
        Self {
            lexical_enabled: config.scorers.lexical,
            embedding: EmbeddingScorer::new(
                config.scorers.embedding,
                config.models.embedding_model_dir.clone(),
                config.models.embedding_model_id.clone(),
            ),
            quality: QualityModel::new(
                config.scorers.quality,
                config.models.quality_checkpoint.clone(),
            ),
        }
    }

    pub fn score(&mut self, source: &str, reference: &str, hypothesis: &str) -> ContentMetrics {
        let lexical_scores = if self.lexical_enabled {
            Some(lexical::score(reference, hypothesis))
        } else {
            None
        };

        let embedding_f1 = self.embedding.score(reference, hypothesis);
        let quality_score = self
            .quality
            .score(&[reference], &[hypothesis])
            .and_then(|scores| scores.into_iter().next());

        let source_tokens = textproc::count_words(source);
        let reference_tokens = textproc::count_words(reference);
        let hypothesis_tokens = textproc::count_words(hypothesis);
        let compression_ratio = if source_tokens > 0 {
            hypothesis_tokens as f64 / source_tokens as f64
        } else {
            0.0
        };

        let rouge_l_f = lexical_scores.map(|s| s.lcs.f_measure);
        let content_quality = MissingPolicy::ZeroFill.weighted_sum(&[
            (WEIGHT_LEXICAL, rouge_l_f),
            (WEIGHT_EMBEDDING, embedding_f1),
            (WEIGHT_QUALITY, quality_score.map(|q| (q + 1.0) / 2.0)),
        ]);

        ContentMetrics {
            rouge1_f: lexical_scores.map(|s| s.unigram.f_measure),
            rouge2_f: lexical_scores.map(|s| s.bigram.f_measure),
            rouge_l_f,
            rouge1_r: lexical_scores.map(|s| s.unigram.recall),
            rouge2_r: lexical_scores.map(|s| s.bigram.recall),
            rouge_l_r: lexical_scores.map(|s| s.lcs.recall),
            embedding_f1,
            quality_score,
            source_tokens,
            reference_tokens,
            hypothesis_tokens,
            compression_ratio,
            content_quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvalConfig;

    fn lexical_only_config() -> EvalConfig {
        let mut config = EvalConfig::default();
        config.scorers.embedding = false;
        config.scorers.quality = false;
        config
    }

    #[test]
    fn identical_pair_lexical_only() {
        let mut scorer = ContentScorer::new(&lexical_only_config());
        let text = "The cat sat on the mat.";
        let metrics = scorer.score(text, text, text);

        assert!((metrics.rouge_l_f.unwrap() - 1.0).abs() < 1e-12);
        assert!((metrics.compression_ratio - 1.0).abs() < 1e-12);
        assert!((metrics.content_quality - 0.4).abs() < 1e-12);
    }

    #[test]
    fn content_quality_degrades_to_lexical_share() {
        let mut scorer = ContentScorer::new(&lexical_only_config());
        let metrics = scorer.score(
            "long source document text here",
            "the cat sat on the mat",
            "the dog sat on the mat",
        );

        let rouge_l_f = metrics.rouge_l_f.unwrap();
        assert!((metrics.content_quality - 0.4 * rouge_l_f).abs() < 1e-12);
        assert!(metrics.embedding_f1.is_none());
        assert!(metrics.quality_score.is_none());
    }

    #[test]
    fn content_quality_bounded_with_all_scorers() {
        let mut config = EvalConfig::default();
        config.scorers.quality = false;
        let mut scorer = ContentScorer::new(&config);

        let metrics = scorer.score(
            "source text about markets",
            "markets rose steadily this quarter",
            "markets rose steadily this quarter",
        );
        assert!(metrics.content_quality >= 0.0);
        assert!(metrics.content_quality <= 1.0);
        assert!(metrics.embedding_f1.is_some());
    }

    #[test]
    fn empty_source_gives_zero_compression() {
        let mut scorer = ContentScorer::new(&lexical_only_config());
        let metrics = scorer.score("", "reference words", "hypothesis words");
        assert_eq!(metrics.source_tokens, 0);
        assert_eq!(metrics.compression_ratio, 0.0);
    }

    #[test]
    fn disabled_lexical_leaves_block_missing() {
        let mut config = lexical_only_config();
        config.scorers.lexical = false;
        let mut scorer = ContentScorer::new(&config);

        let metrics = scorer.score("s", "r", "h");
        assert!(metrics.rouge1_f.is_none());
        assert!(metrics.rouge_l_f.is_none());
        assert_eq!(metrics.content_quality, 0.0);
    }

    #[test]
    fn token_counts_use_word_tokens() {
        let mut scorer = ContentScorer::new(&lexical_only_config());
        let metrics = scorer.score("one two three four", "one two", "one");
        assert_eq!(metrics.source_tokens, 4);
        assert_eq!(metrics.reference_tokens, 2);
        assert_eq!(metrics.hypothesis_tokens, 1);
        assert!((metrics.compression_ratio - 0.25).abs() < 1e-12);
    }
}
