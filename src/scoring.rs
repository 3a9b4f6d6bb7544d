//! Keyword and date heuristics over the recognized text.
//!
//! Pure functions, no I/O. The trust score is a coarse, explainable sum of
//! fixed bonuses; it is not a calibrated probability.

use std::collections::BTreeSet;

use crate::config::HeuristicConfig;

/// Output of the heuristics for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAssessment {
    pub word_count: usize,
    pub detected_issuers: Vec<String>,
    pub has_dates: bool,
    pub trust_score: u8,
}

/// Run every heuristic over `text`.
pub fn assess(text: &str, config: &HeuristicConfig) -> TextAssessment {
    let word_count = count_words(text);
    let detected_issuers = detect_issuers(text, config);
    let has_dates = has_dates(text, config);
    let trust_score = trust_score(word_count, detected_issuers.len(), has_dates, config);
    TextAssessment {
        word_count,
        detected_issuers,
        has_dates,
        trust_score,
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Configured keywords found as case-insensitive substrings, sorted and unique.
pub fn detect_issuers(text: &str, config: &HeuristicConfig) -> Vec<String> {
    let lowered = text.to_lowercase();
    config
        .issuer_keywords
        .iter()
        .map(|kw| kw.to_lowercase())
        .filter(|kw| !kw.is_empty() && lowered.contains(kw.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// A standalone four-digit year inside the window, or a date phrase.
pub fn has_dates(text: &str, config: &HeuristicConfig) -> bool {
    text.split_whitespace().any(|tok| is_year(tok, config)) || {
        let lowered = text.to_lowercase();
        config
            .date_phrases
            .iter()
            .any(|phrase| !phrase.is_empty() && lowered.contains(&phrase.to_lowercase()))
    }
}

fn is_year(token: &str, config: &HeuristicConfig) -> bool {
    token.len() == 4
        && token.bytes().all(|b| b.is_ascii_digit())
        && token
            .parse::<u32>()
            .map(|year| (config.year_min..=config.year_max).contains(&year))
            .unwrap_or(false)
}

/// Base score plus word, issuer and date bonuses, clamped to 0..=100.
pub fn trust_score(
    word_count: usize,
    issuer_count: usize,
    has_dates: bool,
    config: &HeuristicConfig,
) -> u8 {
    let mut score = config.base_score;
    if word_count > config.word_bonus_threshold {
        score = score.saturating_add(config.word_bonus);
    }
    let issuer_count = i64::try_from(issuer_count).unwrap_or(i64::MAX);
    let issuer_bonus = issuer_count
        .saturating_mul(config.per_issuer_bonus)
        .min(config.issuer_bonus_cap);
    score = score.saturating_add(issuer_bonus);
    if has_dates {
        score = score.saturating_add(config.date_bonus);
    }
    score.clamp(0, 100) as u8
}

/// The first `max_chars` characters, with `...` appended when cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
