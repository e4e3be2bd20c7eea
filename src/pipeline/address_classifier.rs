//! Address Classifier (C7): decides whether a transcript is actually
//! talking to the assistant, as opposed to being overheard conversation
//! that merely contains a wake word.
//!
//! Pure text in, verdict out. No state, no I/O, safe to call from the
//! wake detector's hot path on every candidate transcript.

/// Anything that can look at a transcript and decide whether it reads as
/// an instruction directed at the assistant.
pub trait AddressClassifier: Send + Sync {
    /// Returns `(addressed, confidence)`. Must never panic, including on
    /// empty or pathological input — callers rely on this being total.
    fn classify(&self, text: &str) -> (bool, f32);
}

/// Rule-based fallback classifier: no model, no dependencies, just a
/// cheap heuristic over the surface form of the text.
///
/// Fires `(true, 0.9)` when the text mentions "goose" alongside a
/// question mark or one of a handful of request phrases; otherwise
/// `(false, 0.7)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedClassifier;

const REQUEST_MARKERS: [&str; 6] = [
    "?",
    "can you",
    "could you",
    "would you",
    "will you",
    "please",
];

impl AddressClassifier for RuleBasedClassifier {
    fn classify(&self, text: &str) -> (bool, f32) {
        let lowered = text.to_lowercase();

        if lowered.contains("goose") && REQUEST_MARKERS.iter().any(|m| lowered.contains(m)) {
            (true, 0.9)
        } else {
            (false, 0.7)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_never_panics() {
        let (addressed, confidence) = RuleBasedClassifier.classify("");
        assert!(!addressed);
        assert_eq!(confidence, 0.7);
    }

    #[test]
    fn pathological_input_never_panics() {
        let garbage = "\0\u{0}\u{fffd}\n\t".repeat(50);
        let (addressed, _) = RuleBasedClassifier.classify(&garbage);
        assert!(!addressed);
    }

    #[test]
    fn goose_with_question_mark_is_addressed() {
        let (addressed, confidence) = RuleBasedClassifier.classify("goose, what's the weather?");
        assert!(addressed);
        assert_eq!(confidence, 0.9);
    }

    #[test]
    fn goose_with_can_you_is_addressed() {
        let (addressed, confidence) =
            RuleBasedClassifier.classify("hey goose can you check my calendar");
        assert!(addressed);
        assert_eq!(confidence, 0.9);
    }

    #[test]
    fn goose_with_please_is_addressed() {
        let (addressed, _) = RuleBasedClassifier.classify("goose please remind me later");
        assert!(addressed);
    }

    #[test]
    fn goose_alone_is_not_addressed() {
        let (addressed, confidence) =
            RuleBasedClassifier.classify("someone just mentioned a goose in the park");
        assert!(!addressed);
        assert_eq!(confidence, 0.7);
    }

    #[test]
    fn request_marker_without_goose_is_not_addressed() {
        let (addressed, _) = RuleBasedClassifier.classify("could you pass the salt?");
        assert!(!addressed);
    }

    #[test]
    fn is_case_insensitive() {
        let (addressed, _) = RuleBasedClassifier.classify("GOOSE, CAN YOU help me out");
        assert!(addressed);
    }
}
