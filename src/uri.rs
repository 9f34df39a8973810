//! Absolute-URI validation helpers.

use url::Url;

/// Parse an optional string as a well-formed absolute URI.
///
/// Empty or malformed input yields `None`; the caller decides whether that is
/// a validation failure. Never panics and never errors. Input that merely
/// needs escaping (an unescaped space in the path, say) is percent-encoded
/// during parsing rather than rejected.
pub fn valid_uri(value: Option<&str>) -> Option<Url> {
    let value = value?;
    if value.is_empty() {
        return None;
    }
    Url::parse(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_uri_is_accepted() {
        let uri = valid_uri(Some("https://example.com/api")).expect("should parse");
        assert_eq!(uri.scheme(), "https");
    }

    #[test]
    fn custom_scheme_is_accepted() {
        assert!(valid_uri(Some("api://3a4f73a2-0000-0000-0000-000000000000")).is_some());
    }

    #[test]
    fn relative_reference_is_rejected() {
        assert!(valid_uri(Some("TestScope")).is_none());
    }

    #[test]
    fn escapable_input_is_normalized_not_rejected() {
        let uri = valid_uri(Some("https://example.com/a b")).expect("should parse");
        assert_eq!(uri.path(), "/a%20b");
    }

    #[test]
    fn empty_and_missing_are_rejected() {
        assert!(valid_uri(Some("")).is_none());
        assert!(valid_uri(None).is_none());
    }
}
