// File: src/request.rs
// Purpose: Request data handed to page data-fetch functions

use axum::http::{header, HeaderMap, Method, Uri};
use rssr_core::PROPS_MEDIA_TYPE;
use std::collections::BTreeMap;

/// The parts of the incoming request a data-fetch function can inspect
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestInfo {
    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Whether the client asked for serialized props instead of HTML
    pub fn wants_props(&self) -> bool {
        wants_props(&self.headers)
    }
}

/// Whether `Accept` selects the serialized-props channel
pub fn wants_props(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept == PROPS_MEDIA_TYPE)
}

/// Query parameters from URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<String, String>,
}

impl QueryParams {
    /// Parses a query string, with or without the leading `?`
    ///
    /// `+` means space. A repeated key keeps its last value.
    pub fn parse(search: &str) -> Self {
        let search = search.strip_prefix('?').unwrap_or(search);
        let params = search
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_form(key), decode_form(value))
            })
            .collect();
        Self { params }
    }

    /// Get a query parameter value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Get a query parameter as a specific type
    pub fn get_as<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.params.get(key)?.parse().ok()
    }

    /// Check if a parameter exists
    pub fn has(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

fn decode_form(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_query() {
        let query = QueryParams::parse("?tab=posts&page=2&q=hello+world%21");
        assert_eq!(query.get("tab"), Some("posts"));
        assert_eq!(query.get_as::<u32>("page"), Some(2));
        assert_eq!(query.get("q"), Some("hello world!"));
    }

    #[test]
    fn test_parse_query_edge_cases() {
        let query = QueryParams::parse("flag&a=1&a=2&&");
        assert!(query.has("flag"));
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.get("a"), Some("2"));
        assert!(QueryParams::parse("").is_empty());
    }

    #[test]
    fn test_wants_props() {
        let mut headers = HeaderMap::new();
        assert!(!wants_props(&headers));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        assert!(!wants_props(&headers));
        headers.insert(header::ACCEPT, HeaderValue::from_static(PROPS_MEDIA_TYPE));
        assert!(wants_props(&headers));
    }
}
