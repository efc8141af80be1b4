//! Review text cleaning.
//!
//! Raw provider reviews arrive with emoji, control characters, inconsistent
//! Unicode forms and ragged whitespace. `clean` normalizes all of that into
//! the canonical form that review identity, dedup, and encoding all operate
//! on. The pipeline is idempotent: cleaning an already-clean string is a
//! no-op, so a resumed pass never mutates settled records.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Anything that is not a word character, whitespace, or basic punctuation
/// gets stripped — emoji, pictographs, control characters. `\w` is
/// Unicode-aware so accented letters survive.
static RE_NON_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?;:'\-]").expect("valid symbol regex"));

/// Canonicalize one review text: strip non-text symbols, compose to NFC,
/// case-fold, collapse whitespace, trim.
pub fn clean(text: &str) -> String {
    let stripped = RE_NON_TEXT.replace_all(text, "");
    let composed: String = stripped.nfc().collect();
    let lowered = composed.to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A cleaned review that came out empty carries no signal and is dropped
/// locally (never fatal for the place).
pub fn is_usable(cleaned: &str) -> bool {
    !cleaned.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_is_idempotent() {
        let samples = [
            "Cozy spot",
            "cozy   spot",
            "Très bon!! 🍕🍕 Service rapide.",
            "  \tweird\nwhitespace\r\n  ",
            "Ünïcôde café crème",
            "",
        ];
        for s in samples {
            let once = clean(s);
            assert_eq!(clean(&once), once, "clean not idempotent for {s:?}");
        }
    }

    #[test]
    fn clean_strips_emoji() {
        assert_eq!(clean("Great pasta 🍝😍"), "great pasta");
    }

    #[test]
    fn clean_strips_control_chars() {
        assert_eq!(clean("line one\u{0000}\u{0007} line two"), "line one line two");
    }

    #[test]
    fn clean_collapses_whitespace_and_trims() {
        assert_eq!(clean("  cozy \t\n  spot  "), "cozy spot");
    }

    #[test]
    fn clean_case_folds() {
        assert_eq!(clean("Cozy Spot"), clean("cozy spot"));
    }

    #[test]
    fn clean_keeps_accents_and_punctuation() {
        assert_eq!(clean("Très bon, vraiment !"), "très bon, vraiment !");
    }

    #[test]
    fn clean_composes_unicode() {
        // "é" precomposed vs "e" + combining acute must normalize identically
        let composed = "caf\u{00e9}";
        let decomposed = "cafe\u{0301}";
        assert_eq!(clean(composed), clean(decomposed));
    }

    #[test]
    fn emoji_only_review_is_unusable() {
        let cleaned = clean("🔥🔥🔥");
        assert!(!is_usable(&cleaned));
    }
}
