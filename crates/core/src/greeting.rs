//! Greeting detection.
//!
//! Shared by the relay (short-circuit) and conversation memory (greetings are
//! never recorded as turns).

/// Salutations that count as a greeting, already normalized.
pub const GREETINGS: &[&str] = &[
    "hi",
    "hii",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "namaste",
    "greetings",
];

/// Lower-case and trim. Only used for matching; the original text is what
/// goes upstream.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Whole-string match against [`GREETINGS`] after normalization.
pub fn is_greeting(text: &str) -> bool {
    let normalized = normalize(text);
    GREETINGS.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_whitespace_insensitive() {
        assert!(is_greeting(" HI "));
        assert!(is_greeting("hi"));
        assert!(is_greeting("Hi"));
        assert!(is_greeting("\tGood Morning\n"));
        assert!(is_greeting("NAMASTE"));
    }

    #[test]
    fn partial_matches_are_not_greetings() {
        assert!(!is_greeting("hi there"));
        assert!(!is_greeting("hello, what do you sell?"));
        assert!(!is_greeting(""));
        assert!(!is_greeting("good"));
    }

    #[test]
    fn normalize_keeps_inner_spacing() {
        assert_eq!(normalize("  Good   Evening "), "good   evening");
    }
}
