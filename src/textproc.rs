use std::sync::OnceLock;

use regex::Regex;

fn sentence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.!?]+[.!?]*").expect("sentence regex is valid"))
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9]+(?:'[A-Za-z]+)*").expect("word regex is valid"))
}

/// Split text into sentences on terminal punctuation. Deterministic; no
/// abbreviation handling.
pub fn sentences(text: &str) -> Vec<String> {
    sentence_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split text into word tokens: alphanumeric runs, keeping internal
/// apostrophes ("don't" is one token).
pub fn words(text: &str) -> Vec<String> {
    word_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn count_words(text: &str) -> usize {
    word_regex().find_iter(text).count()
}

/// Estimate syllables by counting transitions into vowel runs, dropping a
/// trailing silent `e`, floored at one.
pub fn count_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    let mut count = 0_usize;
    let mut previous_was_vowel = false;

    for ch in word.chars() {
        let is_vowel = matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if is_vowel && !previous_was_vowel {
            count += 1;
        }
        previous_was_vowel = is_vowel;
    }

    if word.ends_with('e') {
        count = count.saturating_sub(1);
    }

    count.max(1)
}

/// Flesch-Kincaid grade estimate, floored at zero.
pub fn reading_grade(text: &str) -> f64 {
    let sentences = sentences(text);
    let words = words(text);

    if sentences.is_empty() || words.is_empty() {
        return 0.0;
    }

    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    let num_sentences = sentences.len() as f64;
    let num_words = words.len() as f64;

    let grade = 0.39 * (num_words / num_sentences) + 11.8 * (syllables as f64 / num_words) - 15.59;

    grade.max(0.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PunctuationCounts {
    pub comma: usize,
    pub period: usize,
    pub exclamation: usize,
    pub question: usize,
}

pub fn punctuation_counts(text: &str) -> PunctuationCounts {
    let mut counts = PunctuationCounts::default();
    for ch in text.chars() {
        match ch {
            ',' => counts.comma += 1,
            '.' => counts.period += 1,
            '!' => counts.exclamation += 1,
            '?' => counts.question += 1,
            _ => {}
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        let text = "First sentence. Second one! Third?";
        let out = sentences(text);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "First sentence.");
        assert_eq!(out[2], "Third?");
    }

    #[test]
    fn sentences_keep_unterminated_tail() {
        let out = sentences("One. And a trailing fragment");
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], "And a trailing fragment");
    }

    #[test]
    fn sentences_empty_input() {
        assert!(sentences("").is_empty());
        assert!(sentences("   ").is_empty());
    }

    #[test]
    fn words_keep_internal_apostrophes() {
        let out = words("Don't stop, it's 2024.");
        assert_eq!(out, vec!["Don't", "stop", "it's", "2024"]);
    }

    #[test]
    fn word_count_matches_words() {
        let text = "alpha beta gamma";
        assert_eq!(count_words(text), words(text).len());
    }

    #[test]
    fn syllables_basic_words() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("cake"), 1);
        assert_eq!(count_syllables("beautiful"), 3);
        assert_eq!(count_syllables("rhythm"), 1);
    }

    #[test]
    fn syllables_floor_at_one() {
        assert_eq!(count_syllables("e"), 1);
        assert_eq!(count_syllables("bcd"), 1);
    }

    #[test]
    fn reading_grade_zero_for_empty() {
        assert_eq!(reading_grade(""), 0.0);
        assert_eq!(reading_grade("   "), 0.0);
    }

    #[test]
    fn reading_grade_nonnegative_for_simple_text() {
        let grade = reading_grade("The cat sat. The dog ran.");
        assert!(grade >= 0.0);
    }

    #[test]
    fn reading_grade_higher_for_complex_text() {
        let simple = reading_grade("The cat sat. The dog ran. He is up.");
        let complex = reading_grade(
            "Organizational interdependencies complicate multinational regulatory harmonization \
             initiatives considerably, notwithstanding intergovernmental collaboration frameworks \
             established previously.",
        );
        assert!(complex > simple);
    }

    #[test]
    fn punctuation_counts_cover_tracked_marks() {
        let counts = punctuation_counts("Wait, what? Yes! Done.");
        assert_eq!(counts.comma, 1);
        assert_eq!(counts.question, 1);
        assert_eq!(counts.exclamation, 1);
        assert_eq!(counts.period, 1);
    }
}
