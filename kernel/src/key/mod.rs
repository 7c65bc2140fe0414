// Key Normalization
//
// Workload generators emit either prefixed keys ("user123") or bare
// identifiers ("123"). The trace always carries the prefixed shape.

use std::borrow::Cow;

/// Prefix `key` unless it already starts with `prefix`.
///
/// No other transformation is applied: no trimming, no case folding.
pub fn normalize_key<'a>(key: &'a str, prefix: &str) -> Cow<'a, str> {
    if key.starts_with(prefix) {
        Cow::Borrowed(key)
    } else {
        Cow::Owned(format!("{prefix}{key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bare_key_is_prefixed() {
        assert_eq!(normalize_key("42", "user"), "user42");
    }

    #[test]
    fn prefixed_key_is_borrowed_unchanged() {
        let key = normalize_key("user42", "user");
        assert!(matches!(key, Cow::Borrowed("user42")));
    }

    #[test]
    fn no_case_folding_or_trimming() {
        assert_eq!(normalize_key("User42", "user"), "userUser42");
        assert_eq!(normalize_key(" 42", "user"), "user 42");
    }

    #[test]
    fn empty_prefix_is_identity() {
        assert_eq!(normalize_key("42", ""), "42");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(key in ".{0,24}", prefix in "[a-z]{0,6}") {
            let once = normalize_key(&key, &prefix).into_owned();
            let twice = normalize_key(&once, &prefix).into_owned();
            prop_assert_eq!(once, twice);
        }
    }
}
