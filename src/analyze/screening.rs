// src/analyze/screening.rs
//! Deterministic script screening that runs alongside the reasoning call.
//!
//! - Forbidden topics: transcript sentences that are NOT part of the approved
//!   script and fuzzily contain every significant token of a forbidden topic.
//!   The sentence is reported verbatim.
//! - Compliance: mandatory phrases must appear in the transcript
//!   (case-insensitive, whitespace-normalized).
//! - Rate mentions: which loan products the texts talk about, for fact lookup.
//!
//! Similarity: `strsim::normalized_levenshtein` plus a shared-prefix rule so
//! that "guarantee" matches "guaranteed".

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use strsim::normalized_levenshtein;

use crate::capability::LoanType;

const TOKEN_SIMILARITY: f64 = 0.8;
const MIN_PREFIX_STEM: usize = 5;

// Decimal numbers ("6.5%") stay inside their sentence.
static RE_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[0-9]+\.[0-9]+|[^.!?])+[.!?]*").expect("sentence regex"));
static RE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}%$']+").expect("token regex"));
static RE_RATE_TALK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(rates?|apr|mortgages?|payments?|interest|refinanc\w*)\b|\d+(\.\d+)?\s*%")
        .expect("rate regex")
});
static RE_FIFTEEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(15|fifteen)[\s-]*(year|yr)").expect("15y regex"));
static RE_ARM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(arm|adjustable|5/1)\b").expect("arm regex"));
static RE_THIRTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(30|thirty)[\s-]*(year|yr)").expect("30y regex"));

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "to", "of", "in", "on", "is", "are", "be", "for", "it", "this",
    "that", "you", "your", "our", "we", "with", "about", "any",
];

/// Short words that flip a topic's meaning; always significant, never fuzzy.
const NEGATIONS: &[&str] = &["no", "not", "never", "without", "zero"];

/// Split into trimmed, non-empty sentences (terminal punctuation kept).
pub fn sentences(text: &str) -> Vec<&str> {
    RE_SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

fn normalize(s: &str) -> String {
    s.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', '!', '?'])
        .to_string()
}

fn tokens(s: &str) -> Vec<String> {
    RE_TOKEN
        .find_iter(&s.to_lowercase())
        .map(|m| m.as_str().trim_matches('\'').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn significant_tokens(s: &str) -> Vec<String> {
    tokens(s)
        .into_iter()
        .filter(|t| {
            let has_digit = t.chars().any(|c| c.is_ascii_digit());
            has_digit
                || NEGATIONS.contains(&t.as_str())
                || (t.chars().count() >= 3 && !STOPWORDS.contains(&t.as_str()))
        })
        .collect()
}

fn token_matches(topic_token: &str, word: &str) -> bool {
    if topic_token == word {
        return true;
    }
    if NEGATIONS.contains(&topic_token) {
        return false;
    }
    let (short, long) = if topic_token.len() <= word.len() {
        (topic_token, word)
    } else {
        (word, topic_token)
    };
    if short.chars().count() >= MIN_PREFIX_STEM && long.starts_with(short) {
        return true;
    }
    normalized_levenshtein(topic_token, word) >= TOKEN_SIMILARITY
}

/// Does `sentence` touch `topic`? Whole-phrase containment, or every
/// significant topic token fuzzily present among the sentence words.
pub fn mentions_topic(sentence: &str, topic: &str) -> bool {
    let norm_sentence = normalize(sentence);
    let norm_topic = normalize(topic);
    if norm_topic.is_empty() {
        return false;
    }
    if norm_sentence.contains(&norm_topic) {
        return true;
    }
    let topic_tokens = significant_tokens(topic);
    if topic_tokens.is_empty() {
        return false;
    }
    let words = tokens(sentence);
    topic_tokens
        .iter()
        .all(|tt| words.iter().any(|w| token_matches(tt, w)))
}

/// Verbatim transcript sentences that deviate from the approved script and
/// touch at least one forbidden topic. Order follows the transcript.
pub fn forbidden_deviations(
    approved_script: &str,
    transcript: &str,
    forbidden_topics: &[String],
) -> Vec<String> {
    let approved: HashSet<String> = sentences(approved_script)
        .into_iter()
        .map(normalize)
        .collect();

    let mut out: Vec<String> = Vec::new();
    for sentence in sentences(transcript) {
        if approved.contains(&normalize(sentence)) {
            continue;
        }
        let hit = forbidden_topics.iter().any(|t| mentions_topic(sentence, t));
        if hit && !out.iter().any(|s| s == sentence) {
            out.push(sentence.to_string());
        }
    }
    out
}

/// Mandatory phrases missing from the transcript.
pub fn missing_compliance(transcript: &str, compliance_phrases: &[String]) -> Vec<String> {
    let haystack = normalize(transcript);
    compliance_phrases
        .iter()
        .filter(|p| {
            let needle = normalize(p);
            !needle.is_empty() && !haystack.contains(&needle)
        })
        .cloned()
        .collect()
}

/// Loan products referenced by the given texts. Empty when nobody talks about
/// rates or payments; 30-year fixed when they do without naming a product.
pub fn referenced_loan_types(texts: &[&str]) -> Vec<LoanType> {
    if !texts.iter().any(|t| RE_RATE_TALK.is_match(t)) {
        return Vec::new();
    }
    let mut out = Vec::new();
    let any = |re: &Regex| texts.iter().any(|t| re.is_match(t));
    if any(&RE_THIRTY) {
        out.push(LoanType::ThirtyYearFixed);
    }
    if any(&RE_FIFTEEN) {
        out.push(LoanType::FifteenYearFixed);
    }
    if any(&RE_ARM) {
        out.push(LoanType::FiveOneArm);
    }
    if out.is_empty() {
        out.push(LoanType::ThirtyYearFixed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sentence_split_keeps_punctuation() {
        let s = sentences("Lock in your rate today! Don't wait. Our guarantee is an Equal Housing Lender.");
        assert_eq!(s, vec!["Lock in your rate today!", "Don't wait.", "Our guarantee is an Equal Housing Lender."]);
    }

    #[test]
    fn fuzzy_topic_matches_inflections() {
        assert!(mentions_topic("rates are basically guaranteed to go up", "guarantee"));
        assert!(mentions_topic("rates are basically guaranteed to go up", "Guaranteed rates"));
        assert!(mentions_topic("You can trust me 100% on this.", "100%"));
        assert!(!mentions_topic("Don't wait.", "guarantee"));
    }

    #[test]
    fn approved_sentences_are_not_deviations() {
        let approved = "Our guarantee is an Equal Housing Lender.";
        let transcript = "Rates are guaranteed to rise. Our guarantee is an Equal Housing Lender.";
        let out = forbidden_deviations(approved, transcript, &topics(&["guarantee"]));
        assert_eq!(out, vec!["Rates are guaranteed to rise."]);
    }

    #[test]
    fn negated_topic_needs_the_negation() {
        let topic = topics(&["no credit check"]);
        assert!(forbidden_deviations(
            "Apply today.",
            "We always run a full credit check before approval.",
            &topic
        )
        .is_empty());
        assert_eq!(
            forbidden_deviations("Apply today.", "Approval with no hard credit check!", &topic),
            vec!["Approval with no hard credit check!"]
        );
        assert!(!mentions_topic("Not every credit check is the same.", "no credit check"));
    }

    #[test]
    fn decimals_do_not_split_sentences() {
        assert_eq!(
            sentences("Rates at 6.5% are guaranteed to drop. Call 555.1234 now!"),
            vec!["Rates at 6.5% are guaranteed to drop.", "Call 555.1234 now!"]
        );
        assert_eq!(
            forbidden_deviations("Apply today.", "Rates at 6.5% are guaranteed to drop.", &topics(&["guarantee"])),
            vec!["Rates at 6.5% are guaranteed to drop."]
        );
        assert_eq!(sentences("Rates hit 7. Then fell."), vec!["Rates hit 7.", "Then fell."]);
    }

    #[test]
    fn compliance_check_is_case_and_space_insensitive() {
        let missing = missing_compliance(
            "We are an equal   housing lender.",
            &topics(&["Equal Housing Lender", "NMLS #12345"]),
        );
        assert_eq!(missing, vec!["NMLS #12345"]);
    }

    #[test]
    fn rate_talk_selects_loan_types() {
        assert!(referenced_loan_types(&["Buy this energy drink now!"]).is_empty());
        assert_eq!(
            referenced_loan_types(&["Lock in your rate today!"]),
            vec![LoanType::ThirtyYearFixed]
        );
        assert_eq!(
            referenced_loan_types(&["A 15-year mortgage or an ARM payment"]),
            vec![LoanType::FifteenYearFixed, LoanType::FiveOneArm]
        );
    }
}
