use std::sync::OnceLock;

use regex::Regex;

/// Validates a login name against the ASCII identifier pattern
/// `^[A-Za-z0-9_]{1,32}$`.
///
/// This is intentionally narrower than the reference implementation's
/// Unicode `\w` semantics, restricted to ASCII for cross-implementation
/// interoperability.
pub fn is_valid_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{1,32}$").expect("pattern is valid"))
        .is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ascii_word_names_up_to_32_chars() {
        assert!(is_valid_name("alice"));
        assert!(is_valid_name("a"));
        assert!(is_valid_name(&"a".repeat(32)));
    }

    #[test]
    fn rejects_empty_too_long_and_non_ascii_names() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name(&"a".repeat(33)));
        assert!(!is_valid_name("al ice"));
        assert!(!is_valid_name("café"));
    }
}
