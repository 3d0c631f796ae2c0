use std::collections::HashSet;
use std::sync::OnceLock;

use crate::textproc;

pub const FEATURE_DIMS: usize = 10;

/// Ordered stylometric feature vector. The dimension order is part of the
/// centroid cache schema; reordering or resizing it invalidates every
/// cached centroid (see the schema tag in `centroid`).
pub type FeatureVector = [f64; FEATURE_DIMS];

/// Dimension names plus their normalization constants, in output order.
/// Hashed into the centroid cache schema tag.
pub const FEATURE_SCHEMA: &[&str] = &[
    "function_word_rate",
    "avg_sentence_length/50",
    "type_token_ratio",
    "comma_rate*100",
    "period_rate*100",
    "exclamation_rate*100",
    "question_rate*100",
    "pronoun_rate",
    "reading_grade/20",
    "avg_word_length/10,clamp1",
];

fn function_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        [
            "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not",
            "on", "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from",
            "they", "we", "say", "her", "she", "or", "an", "will", "my", "one", "all", "would",
            "there", "their", "what", "so", "up", "out", "if", "about", "who", "get", "which",
            "go", "me", "when", "make", "can", "like", "time", "no", "just", "him", "know",
            "take", "people", "into", "year", "your", "good", "some", "could", "them", "see",
            "other", "than", "then", "now", "look", "only", "come", "its", "over",
        ]
        .into_iter()
        .collect()
    })
}

fn pronouns() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        [
            "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my",
            "your", "his", "its", "our", "their", "mine", "yours", "hers", "ours", "theirs",
            "myself", "yourself", "himself", "herself", "itself", "ourselves", "themselves",
        ]
        .into_iter()
        .collect()
    })
}

/// Extract the 10-dimensional stylometric profile of a text.
///
/// Empty or whitespace-only input returns the all-zero vector without
/// touching the tokenizer. The sentence-length and reading-grade
/// dimensions are normalized but unclamped and can exceed 1.0; the
/// word-length dimension is clamped at 1.0 (see DESIGN.md).
pub fn extract(text: &str) -> FeatureVector {
    if text.trim().is_empty() {
        return [0.0; FEATURE_DIMS];
    }

    let sentences = textproc::sentences(text);
    let words = textproc::words(text);

    if words.is_empty() {
        return [0.0; FEATURE_DIMS];
    }

    let words_lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
    let word_count = words.len() as f64;

    let function_word_count = words_lower
        .iter()
        .filter(|w| function_words().contains(w.as_str()))
        .count();
    let function_word_rate = function_word_count as f64 / word_count;

    let avg_sentence_length = if sentences.is_empty() {
        0.0
    } else {
        word_count / sentences.len() as f64
    };

    let distinct: HashSet<&str> = words_lower.iter().map(|w| w.as_str()).collect();
    let type_token_ratio = distinct.len() as f64 / word_count;

    let punct = textproc::punctuation_counts(text);
    let total_chars = text.chars().count() as f64;
    let comma_rate = punct.comma as f64 / total_chars;
    let period_rate = punct.period as f64 / total_chars;
    let exclamation_rate = punct.exclamation as f64 / total_chars;
    let question_rate = punct.question as f64 / total_chars;

    let pronoun_count = words_lower
        .iter()
        .filter(|w| pronouns().contains(w.as_str()))
        .count();
    let pronoun_rate = pronoun_count as f64 / word_count;

    let grade = textproc::reading_grade(text);

    let avg_word_length =
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count;

    [
        function_word_rate,
        avg_sentence_length / 50.0,
        type_token_ratio,
        comma_rate * 100.0,
        period_rate * 100.0,
        exclamation_rate * 100.0,
        question_rate * 100.0,
        pronoun_rate,
        grade / 20.0,
        (avg_word_length / 10.0).min(1.0),
    ]
}
