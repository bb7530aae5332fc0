//! Integration tests for rssr-router
//!
//! Tests are organized by feature area:
//! - Static and single dynamic segments
//! - Catch-all and optional catch-all segments
//! - Parameter decoding
//! - Table order

use pretty_assertions::assert_eq;
use rssr_router::*;
use rstest::rstest;

fn matcher(patterns: &[&str]) -> RouteMatcher<String> {
    RouteMatcher::new(patterns.iter().map(|p| (*p, format!("{p}.js")))).unwrap()
}

// ============================================================================
// Static and dynamic segments
// ============================================================================

#[test]
fn test_static_route() {
    let m = matcher(&["/about"]);
    assert!(m.match_path("/about").unwrap().is_some());
    assert!(m.match_path("/about/").unwrap().is_some());
    assert!(m.match_path("/other").unwrap().is_none());
    assert!(m.match_path("/about/team").unwrap().is_none());
}

#[test]
fn test_root_route() {
    let m = matcher(&["/"]);
    let matched = m.match_path("/").unwrap().unwrap();
    assert_eq!(matched.path, "/");
    assert!(matched.params.is_empty());
    assert!(m.match_path("/x").unwrap().is_none());
}

#[test]
fn test_dynamic_route() {
    let m = matcher(&["/users/[id]"]);
    let matched = m.match_path("/users/42").unwrap().unwrap();
    assert_eq!(matched.path, "/users/[id]");
    assert_eq!(matched.value, "/users/[id].js");
    assert_eq!(matched.params.get_str("id"), Some("42"));
}

#[rstest]
#[case("/users/42/edit")]
#[case("/users")]
#[case("/users/")]
#[case("/users//")]
fn test_dynamic_segment_never_crosses_slash(#[case] path: &str) {
    let m = matcher(&["/users/[id]"]);
    assert!(m.match_path(path).unwrap().is_none(), "{path} should not match");
}

#[test]
fn test_multiple_dynamic_segments() {
    let m = matcher(&["/shop/[category]/[item]"]);
    let matched = m.match_path("/shop/electronics/laptop").unwrap().unwrap();
    assert_eq!(matched.params.get_str("category"), Some("electronics"));
    assert_eq!(matched.params.get_str("item"), Some("laptop"));
}

#[test]
fn test_dynamic_segment_trailing_slash() {
    let m = matcher(&["/users/[id]"]);
    let matched = m.match_path("/users/7/").unwrap().unwrap();
    assert_eq!(matched.params.get_str("id"), Some("7"));
}

// ============================================================================
// Catch-all segments
// ============================================================================

#[test]
fn test_catch_all() {
    let m = matcher(&["/docs/[...slug]"]);
    let matched = m.match_path("/docs/a/b/c").unwrap().unwrap();
    assert_eq!(matched.params.get("slug"), Some(&ParamValue::from(vec!["a", "b", "c"])));
}

#[test]
fn test_catch_all_single_component_is_still_a_list() {
    let m = matcher(&["/docs/[...slug]"]);
    let matched = m.match_path("/docs/intro").unwrap().unwrap();
    assert_eq!(matched.params.get("slug"), Some(&ParamValue::from(vec!["intro"])));
}

#[test]
fn test_catch_all_requires_one_component() {
    let m = matcher(&["/docs/[...slug]"]);
    assert!(m.match_path("/docs").unwrap().is_none());
    assert!(m.match_path("/docs/").unwrap().is_none());
}

#[test]
fn test_optional_catch_all_matches_bare_path() {
    let m = matcher(&["/docs/[[...slug]]"]);

    let bare = m.match_path("/docs").unwrap().unwrap();
    assert!(!bare.params.contains("slug"));

    let slashed = m.match_path("/docs/").unwrap().unwrap();
    assert!(!slashed.params.contains("slug"));

    let deep = m.match_path("/docs/a/b").unwrap().unwrap();
    assert_eq!(deep.params.get("slug"), Some(&ParamValue::from(vec!["a", "b"])));
}

#[test]
fn test_catch_all_after_dynamic() {
    let m = matcher(&["/[lang]/[...path]"]);
    let matched = m.match_path("/en/guides/setup").unwrap().unwrap();
    assert_eq!(matched.params.get_str("lang"), Some("en"));
    assert_eq!(
        matched.params.get("path"),
        Some(&ParamValue::from(vec!["guides", "setup"]))
    );
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_params_are_percent_decoded() {
    let m = matcher(&["/search/[term]"]);
    let matched = m.match_path("/search/hello%20world").unwrap().unwrap();
    assert_eq!(matched.params.get_str("term"), Some("hello world"));
}

#[test]
fn test_catch_all_components_decoded_individually() {
    let m = matcher(&["/files/[...path]"]);
    let matched = m.match_path("/files/a%2Fb/c%20d").unwrap().unwrap();
    assert_eq!(
        matched.params.get("path"),
        Some(&ParamValue::from(vec!["a/b", "c d"]))
    );
}

#[test]
fn test_decode_failure_is_an_error() {
    let m = matcher(&["/users/[id]"]);
    let err = m.match_path("/users/%E0%A4%A").unwrap_err();
    assert_eq!(
        err,
        MatchError::Decode {
            param: "id".to_string(),
            value: "%E0%A4%A".to_string(),
        }
    );
}

#[test]
fn test_params_serialize_like_plain_objects() {
    let m = matcher(&["/[lang]/[...path]"]);
    let matched = m.match_path("/en/a/b").unwrap().unwrap();
    let json = serde_json::to_value(&matched.params).unwrap();
    assert_eq!(json, serde_json::json!({ "lang": "en", "path": ["a", "b"] }));
}

// ============================================================================
// Table order
// ============================================================================

#[test]
fn test_first_registered_wins_dynamic_first() {
    let m = matcher(&["/a/[id]", "/a/special"]);
    let matched = m.match_path("/a/special").unwrap().unwrap();
    assert_eq!(matched.path, "/a/[id]");
    assert_eq!(matched.params.get_str("id"), Some("special"));
}

#[test]
fn test_first_registered_wins_static_first() {
    let m = matcher(&["/a/special", "/a/[id]"]);
    let matched = m.match_path("/a/special").unwrap().unwrap();
    assert_eq!(matched.path, "/a/special");
    assert!(matched.params.is_empty());

    let other = m.match_path("/a/other").unwrap().unwrap();
    assert_eq!(other.path, "/a/[id]");
}

#[test]
fn test_routes_preserve_order() {
    let m = matcher(&["/b", "/a", "/c/[x]"]);
    let order: Vec<&str> = m.routes().map(|(path, _)| path).collect();
    assert_eq!(order, vec!["/b", "/a", "/c/[x]"]);
    assert_eq!(m.len(), 3);
    assert_eq!(m.get("/a").map(String::as_str), Some("/a.js"));
}

#[test]
fn test_invalid_pattern_fails_construction() {
    let result = RouteMatcher::new([("/users/[]", ())]);
    assert!(matches!(result, Err(PatternError::EmptyParamName { .. })));
}

#[test]
fn test_empty_matcher() {
    let m: RouteMatcher<()> = RouteMatcher::default();
    assert!(m.is_empty());
    assert!(m.match_path("/").unwrap().is_none());
}
