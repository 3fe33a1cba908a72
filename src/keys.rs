//! Cache Key Construction
//!
//! Builds collision-free cache keys for lookup and search operations: a
//! stable prefix per operation kind joined with normalized parameters.
//! Parameter values that could contain the delimiter are base64-encoded
//! before concatenation, so distinct logical queries never share a key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Separator between the operation prefix and each parameter.
const DELIMITER: char = ':';

/// Marker prepended to base64-encoded parts. Literal parts can never start
/// with it (`~` is outside the literal character set), so an encoded part
/// is always distinguishable from a literal one.
const ENCODED_MARKER: char = '~';

/// Builds a cache key from an operation prefix and its parameters.
///
/// Parameters consisting only of `[A-Za-z0-9._-]` are appended verbatim;
/// anything else (delimiters, spaces, unicode, empty strings) is
/// base64-encoded and marked.
///
/// ```
/// use registry_cache::keys::cache_key;
///
/// let key = cache_key("package_info", &["dplyr", "1.1.4"]);
/// assert_eq!(key, "package_info:dplyr:1.1.4");
/// ```
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    let mut key = String::from(prefix);
    for part in parts {
        key.push(DELIMITER);
        if is_literal_safe(part) {
            key.push_str(part);
        } else {
            key.push(ENCODED_MARKER);
            key.push_str(&URL_SAFE_NO_PAD.encode(part.as_bytes()));
        }
    }
    key
}

fn is_literal_safe(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_parts_stay_readable() {
        assert_eq!(
            cache_key("search", &["tidyverse", "20"]),
            "search:tidyverse:20"
        );
    }

    #[test]
    fn test_delimiter_in_part_is_encoded() {
        let key = cache_key("readme", &["owner:repo"]);
        assert!(!key["readme:".len()..].contains(':'));
        assert!(key.starts_with("readme:~"));
    }

    #[test]
    fn test_encoded_and_literal_parts_never_collide() {
        // A literal part equal to some base64 output must not collide with
        // the encoded form of a different part.
        let encoded = cache_key("op", &["a:b"]);
        let literal = cache_key("op", &[&URL_SAFE_NO_PAD.encode("a:b")]);
        assert_ne!(encoded, literal);
    }

    #[test]
    fn test_distinct_queries_distinct_keys() {
        let a = cache_key("package_info", &["dplyr", "1.0"]);
        let b = cache_key("package_info", &["dplyr", "1.1"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_part_is_encoded() {
        let a = cache_key("op", &[""]);
        let b = cache_key("op", &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_unicode_part_is_encoded() {
        let key = cache_key("op", &["paquete-espa\u{f1}ol"]);
        assert!(key.contains(ENCODED_MARKER));
        assert!(key.is_ascii());
    }
}
