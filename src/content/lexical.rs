use std::collections::HashMap;

/// Precision/recall/F for one overlap variant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlapScore {
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LexicalScores {
    pub unigram: OverlapScore,
    pub bigram: OverlapScore,
    pub lcs: OverlapScore,
}

/// N-gram and longest-common-subsequence overlap of hypothesis against
/// reference, over lowercased, alnum-filtered, lightly stemmed tokens.
pub fn score(reference: &str, hypothesis: &str) -> LexicalScores {
    let ref_tokens = content_tokens(reference);
    let hyp_tokens = content_tokens(hypothesis);

    LexicalScores {
        unigram: ngram_overlap(&ref_tokens, &hyp_tokens, 1),
        bigram: ngram_overlap(&ref_tokens, &hyp_tokens, 2),
        lcs: lcs_overlap(&ref_tokens, &hyp_tokens),
    }
}

/// Lowercase, drop non-alphanumeric characters, stem. Mirrors the word
/// filtering used for embedding payloads so both scorers see the same
/// vocabulary.
pub fn content_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| {
            raw.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|token| !token.is_empty())
        .map(|token| stem(&token).to_string())
        .collect()
}

/// Light suffix-stripping stem, applied only to tokens longer than three
/// characters. Not a full Porter stemmer; enough to collapse common
/// inflections ("jumping"/"jumped", "studies"/"studied").
fn stem(token: &str) -> &str {
    if token.len() > 3 {
        for suffix in ["ing", "ies", "ied", "ed", "es", "ly", "s"] {
            if let Some(stripped) = token.strip_suffix(suffix) {
                if stripped.len() >= 2 {
                    return stripped;
                }
            }
        }
    }
    token
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<Vec<&str>, usize> {
    let mut counts = HashMap::new();
    if tokens.len() < n {
        return counts;
    }
    for window in tokens.windows(n) {
        let gram: Vec<&str> = window.iter().map(|t| t.as_str()).collect();
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

fn ngram_overlap(ref_tokens: &[String], hyp_tokens: &[String], n: usize) -> OverlapScore {
    let ref_counts = ngram_counts(ref_tokens, n);
    let hyp_counts = ngram_counts(hyp_tokens, n);

    let ref_total: usize = ref_counts.values().sum();
    let hyp_total: usize = hyp_counts.values().sum();

    let mut overlap = 0_usize;
    for (gram, hyp_count) in &hyp_counts {
        if let Some(ref_count) = ref_counts.get(gram) {
            overlap += hyp_count.min(ref_count);
        }
    }

    from_counts(overlap, ref_total, hyp_total)
}

fn lcs_overlap(ref_tokens: &[String], hyp_tokens: &[String]) -> OverlapScore {
    let lcs = lcs_length(ref_tokens, hyp_tokens);
    from_counts(lcs, ref_tokens.len(), hyp_tokens.len())
}

fn from_counts(overlap: usize, ref_total: usize, hyp_total: usize) -> OverlapScore {
    let precision = if hyp_total > 0 {
        overlap as f64 / hyp_total as f64
    } else {
        0.0
    };
    let recall = if ref_total > 0 {
        overlap as f64 / ref_total as f64
    } else {
        0.0
    };
    let f_measure = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    OverlapScore {
        precision,
        recall,
        f_measure,
    }
}

fn lcs_length(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // One-row DP; b is the inner dimension.
    let mut row = vec![0_usize; b.len() + 1];
    for a_token in a {
        let mut diagonal = 0_usize;
        for (j, b_token) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if a_token == b_token {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}
