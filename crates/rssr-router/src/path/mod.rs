/// Path utilities: parameter decoding and target splitting
///
/// All functions are **pure**: given same input, always produce same output with no side effects.

pub mod hierarchy;
pub use hierarchy::PathHierarchy;

/// Percent-decodes one captured path parameter
///
/// Follows `decodeURIComponent` strictly: every `%` must start a two-digit
/// hex escape and the decoded bytes must be valid UTF-8. `+` is left as is.
///
/// # Examples
///
/// ```
/// use rssr_router::path::decode_component;
///
/// assert_eq!(decode_component("hello%20world").unwrap(), "hello world");
/// assert_eq!(decode_component("caf%C3%A9").unwrap(), "café");
/// assert!(decode_component("100%").is_none());
/// assert!(decode_component("%E0%A4%A").is_none());
/// ```
pub fn decode_component(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    urlencoding::decode(raw).ok().map(|decoded| decoded.into_owned())
}

/// Splits a navigation target into pathname and search (`?` included)
///
/// # Examples
///
/// ```
/// use rssr_router::path::split_path_and_query;
///
/// assert_eq!(split_path_and_query("/users/7?tab=1"), ("/users/7", "?tab=1"));
/// assert_eq!(split_path_and_query("/users/7"), ("/users/7", ""));
/// ```
pub fn split_path_and_query(target: &str) -> (&str, &str) {
    match target.find('?') {
        Some(index) => target.split_at(index),
        None => (target, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain() {
        assert_eq!(decode_component("42").as_deref(), Some("42"));
        assert_eq!(decode_component("").as_deref(), Some(""));
    }

    #[test]
    fn test_decode_keeps_plus() {
        assert_eq!(decode_component("a+b").as_deref(), Some("a+b"));
    }

    #[test]
    fn test_decode_escaped_slash() {
        assert_eq!(decode_component("a%2Fb").as_deref(), Some("a/b"));
    }

    #[test]
    fn test_decode_malformed_escape() {
        assert_eq!(decode_component("%zz"), None);
        assert_eq!(decode_component("%4"), None);
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert_eq!(decode_component("%FF"), None);
    }

    #[test]
    fn test_split_keeps_later_question_marks() {
        assert_eq!(split_path_and_query("/a?b?c"), ("/a", "?b?c"));
        assert_eq!(split_path_and_query("?x"), ("", "?x"));
    }

    #[test]
    fn test_path_hierarchy() {
        let paths: Vec<&str> = PathHierarchy::new("/a/b/c/d").collect();
        assert_eq!(paths, vec!["/a/b/c/d", "/a/b/c", "/a/b", "/a", "/"]);

        let paths: Vec<&str> = PathHierarchy::new("/users").collect();
        assert_eq!(paths, vec!["/users", "/"]);

        let paths: Vec<&str> = PathHierarchy::new("/").collect();
        assert_eq!(paths, vec!["/"]);
    }

    #[test]
    fn test_path_hierarchy_root_first() {
        let paths = PathHierarchy::new("/users/[id]").root_first();
        assert_eq!(paths, vec!["/", "/users", "/users/[id]"]);
    }
}
