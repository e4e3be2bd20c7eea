//! Wake Detector (C6): scans a transcript for a wake word or phrase, then
//! asks the address classifier (C7) whether the surrounding text actually
//! reads as directed at the assistant.
//!
//! Matching runs in a fixed order — exact word, exact phrase, fuzzy word,
//! fuzzy phrase — and stops at the first hit, so an exact match is never
//! overridden by a fuzzy one elsewhere in the same transcript. Among
//! matches found at the same step, the earliest occurrence in the text
//! wins.

use crate::pipeline::address_classifier::AddressClassifier;

const WAKE_WORDS: [&str; 2] = ["goose", "gus"];
const WAKE_PHRASES: [&str; 2] = ["hey goose", "hey gus"];

#[derive(Debug, Clone, Copy)]
pub struct WakeDetectorConfig {
    pub fuzzy_threshold: u8,
    pub classifier_threshold: f32,
    pub verbosity: u8,
}

impl Default for WakeDetectorConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 80,
            classifier_threshold: 0.6,
            verbosity: 0,
        }
    }
}

/// How the wake word was found in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    ExactWord,
    ExactPhrase,
    FuzzyWord,
    FuzzyPhrase,
}

/// Result of a single wake-detection pass over one transcript.
#[derive(Debug, Clone)]
pub struct WakeDetection {
    pub matched: bool,
    pub kind: Option<MatchKind>,
    /// The wake word or phrase normalised into canonical form ("goose" or
    /// "hey goose"), as handed to the address classifier.
    pub canonical: Option<String>,
    pub byte_offset: Option<usize>,
    pub addressed: bool,
    pub confidence: f32,
    pub accepted: bool,
}

pub struct WakeDetector<C: AddressClassifier> {
    config: WakeDetectorConfig,
    classifier: C,
}

impl<C: AddressClassifier> WakeDetector<C> {
    pub fn new(config: WakeDetectorConfig, classifier: C) -> Self {
        Self { config, classifier }
    }

    /// Scans `text` for a wake word/phrase and, if one is found, normalises
    /// the matched span to its canonical form ("goose" or "hey goose")
    /// before handing the result to the address classifier — so a fuzzy
    /// match on a variant like "gus" still reads as addressed to Goose
    /// rather than being invisible to a classifier that only recognises
    /// the canonical spelling. Every call is logged at verbosity >= 1
    /// regardless of outcome, since the audit trail matters as much for
    /// rejections as for acceptances.
    pub fn detect(&self, text: &str) -> WakeDetection {
        let lowered = text.to_lowercase();

        let found = find_exact_word(&lowered)
            .or_else(|| find_exact_phrase(&lowered))
            .or_else(|| find_fuzzy_word(&lowered, self.config.fuzzy_threshold))
            .or_else(|| find_fuzzy_phrase(&lowered, self.config.fuzzy_threshold));

        let Some((kind, matched_literal, offset)) = found else {
            let detection = WakeDetection {
                matched: false,
                kind: None,
                canonical: None,
                byte_offset: None,
                addressed: false,
                confidence: 0.0,
                accepted: false,
            };
            self.log(text, &detection);
            return detection;
        };

        let canonical = canonical_form(kind);
        let normalized = lowered.replace(matched_literal.as_str(), canonical);
        let (addressed, confidence) = self.classifier.classify(&normalized);
        let accepted = addressed && confidence >= self.config.classifier_threshold;

        let detection = WakeDetection {
            matched: true,
            kind: Some(kind),
            canonical: Some(canonical.to_string()),
            byte_offset: Some(offset),
            addressed,
            confidence,
            accepted,
        };
        self.log(text, &detection);
        detection
    }

    fn log(&self, raw: &str, detection: &WakeDetection) {
        if self.config.verbosity >= 1 {
            eprintln!(
                "wake_detector: raw={:?} normalized={:?} matched={} kind={:?} addressed={} confidence={:.2} accepted={}",
                raw,
                detection.canonical,
                detection.matched,
                detection.kind,
                detection.addressed,
                detection.confidence,
                detection.accepted,
            );
        }
    }
}

/// The fixed form a match of this kind is normalised to before the text
/// reaches the address classifier, regardless of which literal wake word
/// or phrase ("gus", "hey gus", ...) actually matched.
fn canonical_form(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::ExactWord | MatchKind::FuzzyWord => "goose",
        MatchKind::ExactPhrase | MatchKind::FuzzyPhrase => "hey goose",
    }
}

fn find_exact_word(lowered: &str) -> Option<(MatchKind, String, usize)> {
    earliest_substring_match(lowered, &WAKE_WORDS)
        .map(|(word, offset)| (MatchKind::ExactWord, word.to_string(), offset))
}

fn find_exact_phrase(lowered: &str) -> Option<(MatchKind, String, usize)> {
    earliest_substring_match(lowered, &WAKE_PHRASES)
        .map(|(phrase, offset)| (MatchKind::ExactPhrase, phrase.to_string(), offset))
}

fn earliest_substring_match<'a>(
    lowered: &str,
    candidates: &[&'a str],
) -> Option<(&'a str, usize)> {
    candidates
        .iter()
        .filter_map(|candidate| lowered.find(candidate).map(|offset| (*candidate, offset)))
        .min_by_key(|(_, offset)| *offset)
}

fn find_fuzzy_word(lowered: &str, threshold: u8) -> Option<(MatchKind, String, usize)> {
    let mut best: Option<(&str, usize, u8)> = None;

    for (offset, token) in token_offsets(lowered) {
        for wake_word in WAKE_WORDS {
            let score = similarity_score(token, wake_word);
            if score >= threshold {
                let better = match best {
                    None => true,
                    Some((_, best_offset, _)) => offset < best_offset,
                };
                if better {
                    best = Some((wake_word, offset, score));
                }
            }
        }
    }

    best.map(|(word, offset, _)| (MatchKind::FuzzyWord, word.to_string(), offset))
}

fn find_fuzzy_phrase(lowered: &str, threshold: u8) -> Option<(MatchKind, String, usize)> {
    let mut best: Option<(&str, usize)> = None;

    for phrase in WAKE_PHRASES {
        let phrase_len = phrase.split_whitespace().count();
        let tokens: Vec<(usize, &str)> = token_offsets(lowered).collect();

        for window in tokens.windows(phrase_len) {
            if window.len() < phrase_len {
                continue;
            }
            let candidate = window
                .iter()
                .map(|(_, t)| *t)
                .collect::<Vec<_>>()
                .join(" ");
            let score = similarity_score(&candidate, phrase);
            if score >= threshold {
                let offset = window[0].0;
                let better = match best {
                    None => true,
                    Some((_, best_offset)) => offset < best_offset,
                };
                if better {
                    best = Some((phrase, offset));
                }
            }
        }
    }

    best.map(|(phrase, offset)| (MatchKind::FuzzyPhrase, phrase.to_string(), offset))
}

fn token_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_word_bound_indices()
}

/// Splits on non-alphanumeric boundaries, yielding (byte_offset, word)
/// pairs for only the alphanumeric tokens.
trait WordBoundIndices {
    fn split_word_bound_indices(&self) -> Box<dyn Iterator<Item = (usize, &str)> + '_>;
}

impl WordBoundIndices for str {
    fn split_word_bound_indices(&self) -> Box<dyn Iterator<Item = (usize, &str)> + '_> {
        let mut result = Vec::new();
        let mut start = None;
        for (idx, ch) in self.char_indices() {
            if ch.is_alphanumeric() {
                if start.is_none() {
                    start = Some(idx);
                }
            } else if let Some(s) = start.take() {
                result.push((s, &self[s..idx]));
            }
        }
        if let Some(s) = start {
            result.push((s, &self[s..]));
        }
        Box::new(result.into_iter())
    }
}

/// Similarity on a 0-100 scale (Jaro-Winkler, matching the conventional
/// "fuzzy ratio" scale used by fuzzy-match libraries elsewhere).
fn similarity_score(a: &str, b: &str) -> u8 {
    (strsim::jaro_winkler(a, b) * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysAddressed(f32);
    impl AddressClassifier for AlwaysAddressed {
        fn classify(&self, _text: &str) -> (bool, f32) {
            (true, self.0)
        }
    }

    struct NeverAddressed;
    impl AddressClassifier for NeverAddressed {
        fn classify(&self, _text: &str) -> (bool, f32) {
            (false, 0.1)
        }
    }

    fn detector(classifier_threshold: f32) -> WakeDetector<AlwaysAddressed> {
        WakeDetector::new(
            WakeDetectorConfig {
                fuzzy_threshold: 80,
                classifier_threshold,
                verbosity: 0,
            },
            AlwaysAddressed(0.95),
        )
    }

    #[test]
    fn exact_word_match_is_detected() {
        let detection = detector(0.6).detect("goose what time is it");
        assert!(detection.matched);
        assert_eq!(detection.kind, Some(MatchKind::ExactWord));
        assert_eq!(detection.canonical.as_deref(), Some("goose"));
    }

    #[test]
    fn exact_word_step_takes_priority_over_phrase_step() {
        // "hey goose" would also satisfy the phrase step, but the word
        // step runs first and already finds "goose", so it wins outright
        // regardless of where either candidate starts in the text.
        let detection = detector(0.6).detect("hey goose turn off the lights");
        assert!(detection.matched);
        assert_eq!(detection.kind, Some(MatchKind::ExactWord));
        assert_eq!(detection.canonical.as_deref(), Some("goose"));
    }

    #[test]
    fn fuzzy_word_catches_misrecognition() {
        let detection = detector(0.6).detect("goos can you help me");
        assert!(detection.matched);
        assert_eq!(detection.kind, Some(MatchKind::FuzzyWord));
    }

    #[test]
    fn no_wake_word_is_not_matched() {
        let detection = detector(0.6).detect("the weather is nice today");
        assert!(!detection.matched);
        assert!(!detection.accepted);
    }

    #[test]
    fn below_classifier_threshold_is_not_accepted() {
        let detector = WakeDetector::new(
            WakeDetectorConfig {
                fuzzy_threshold: 80,
                classifier_threshold: 0.6,
                verbosity: 0,
            },
            AlwaysAddressed(0.5),
        );
        let detection = detector.detect("goose can you help");
        assert!(detection.matched);
        assert!(!detection.accepted);
    }

    #[test]
    fn classifier_rejection_is_not_accepted_even_with_wake_word() {
        let detector = WakeDetector::new(
            WakeDetectorConfig::default(),
            NeverAddressed,
        );
        let detection = detector.detect("goose can you help");
        assert!(detection.matched);
        assert!(!detection.addressed);
        assert!(!detection.accepted);
    }

    #[test]
    fn empty_text_does_not_match_and_does_not_panic() {
        let detection = detector(0.6).detect("");
        assert!(!detection.matched);
    }

    #[test]
    fn earliest_exact_word_occurrence_wins() {
        let detection = detector(0.6).detect("gus, did you hear about gus");
        assert_eq!(detection.byte_offset, Some(0));
    }

    #[test]
    fn exact_word_variant_normalises_canonical_to_goose() {
        let detection = detector(0.6).detect("gus what time is it");
        assert_eq!(detection.kind, Some(MatchKind::ExactWord));
        assert_eq!(detection.canonical.as_deref(), Some("goose"));
    }

    #[test]
    fn exact_phrase_variant_normalises_canonical_to_hey_goose() {
        let detection = detector(0.6).detect("hey gus turn off the lights");
        assert_eq!(detection.kind, Some(MatchKind::ExactPhrase));
        assert_eq!(detection.canonical.as_deref(), Some("hey goose"));
    }

    #[test]
    fn gus_variant_is_accepted_by_rule_based_classifier_after_normalization() {
        use crate::pipeline::address_classifier::RuleBasedClassifier;

        let detector = WakeDetector::new(WakeDetectorConfig::default(), RuleBasedClassifier);
        let detection = detector.detect("hey gus could you summarise this");
        assert!(detection.matched);
        assert!(detection.addressed);
        assert!(detection.accepted);
    }

    #[test]
    fn gus_mentioned_without_request_marker_is_still_rejected_after_normalization() {
        use crate::pipeline::address_classifier::RuleBasedClassifier;

        let detector = WakeDetector::new(WakeDetectorConfig::default(), RuleBasedClassifier);
        let detection = detector.detect("someone at work is named gus");
        assert!(!detection.accepted);
    }
}
