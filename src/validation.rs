//! Key Validation
//!
//! Decides whether a candidate key may be written.

/// Maximum allowed key length in characters
pub const MAX_KEY_LENGTH: usize = 256;

/// Returns true when `key` is 1..=256 characters from `[A-Za-z0-9_.-]`.
pub fn is_valid_key(key: &str) -> bool {
    // Allowed characters are single-byte, so byte length equals char count here.
    !key.is_empty() && key.len() <= MAX_KEY_LENGTH && key.bytes().all(is_allowed_key_byte)
}

fn is_allowed_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accepts_allowed_characters() {
        assert!(is_valid_key("test-key"));
        assert!(is_valid_key("a.b_c-D9"));
        assert!(is_valid_key("."));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(!is_valid_key(""));
    }

    #[test]
    fn test_length_boundary() {
        assert!(is_valid_key(&"k".repeat(MAX_KEY_LENGTH)));
        assert!(!is_valid_key(&"k".repeat(MAX_KEY_LENGTH + 1)));
    }

    #[test]
    fn test_rejects_disallowed_characters() {
        for key in ["a/b", "a b", "key%20", "ключ", "a:b", "a\nb", "é"] {
            assert!(!is_valid_key(key), "{key:?} should be rejected");
        }
    }

    proptest! {
        #[test]
        fn prop_valid_keys_accepted(key in "[A-Za-z0-9_.-]{1,256}") {
            prop_assert!(is_valid_key(&key));
        }

        #[test]
        fn prop_too_long_rejected(key in "[A-Za-z0-9_.-]{257,400}") {
            prop_assert!(!is_valid_key(&key));
        }

        #[test]
        fn prop_foreign_character_rejected(
            prefix in "[A-Za-z0-9_.-]{0,100}",
            bad in "[^A-Za-z0-9_.-]",
            suffix in "[A-Za-z0-9_.-]{0,100}",
        ) {
            let key = format!("{prefix}{bad}{suffix}");
            prop_assert!(!is_valid_key(&key));
        }
    }
}
