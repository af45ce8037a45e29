//! Key term normalization
//!
//! Keys and search phrases are folded to a canonical upper-case form before
//! any comparison, so the trie stores one spelling per term.

use std::borrow::Cow;

/// Normalize a term to its canonical upper-case form.
///
/// Folding is code-point-wise; borrowing the input when it contains no
/// lowercase character avoids an allocation on the query path, where the
/// phrase is usually already normalized.
#[must_use]
pub fn normalize_term(term: &str) -> Cow<'_, str> {
    if term.chars().any(char::is_lowercase) {
        Cow::Owned(term.to_uppercase())
    } else {
        Cow::Borrowed(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_to_upper_case() {
        assert_eq!(normalize_term("cat"), "CAT");
        assert_eq!(normalize_term("Domestic rabbit"), "DOMESTIC RABBIT");
        assert_eq!(normalize_term("café"), "CAFÉ");
    }

    #[test]
    fn test_already_normalized_borrows() {
        assert!(matches!(normalize_term("CAT"), Cow::Borrowed(_)));
        assert!(matches!(normalize_term(""), Cow::Borrowed(_)));
        assert!(matches!(normalize_term("R2-D2"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_term("Wolverine").into_owned();
        assert_eq!(normalize_term(&once), once);
    }
}
