// File: src/table.rs
// Purpose: Route table discovery from the page and build directories

use rssr_core::ClientRoutes;
use rssr_router::RouteMatcher;
use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::assets::AssetRegistry;
use crate::error::Error;

/// Ordered pattern → module path table
pub type RouteTable = RouteMatcher<String>;

/// Convert a page path relative to its root into a route pattern
///
/// `index.rs` → `/`, `users/index.rs` → `/users`, `users/[id].rs` → `/users/[id]`
pub fn path_to_route(relative: &Path) -> String {
    let route = relative
        .with_extension("")
        .to_string_lossy()
        .replace('\\', "/");

    if route == "index" || route.is_empty() {
        "/".to_string()
    } else if let Some(without_index) = route.strip_suffix("/index") {
        format!("/{}", without_index.trim_start_matches('/'))
    } else {
        format!("/{}", route.trim_start_matches('/'))
    }
}

/// Sibling order: plain names, then `[x]`, then `[...x]`, then `[[...x]]`
///
/// Routes are matched in table order, so static pages must come before the
/// dynamic pages they overlap with.
fn segment_rank(name: &str) -> u8 {
    if name.starts_with("[[...") {
        3
    } else if name.starts_with("[...") {
        2
    } else if name.starts_with('[') {
        1
    } else {
        0
    }
}

fn compare_entries(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_name = a.file_name().to_string_lossy();
    let b_name = b.file_name().to_string_lossy();
    segment_rank(&a_name)
        .cmp(&segment_rank(&b_name))
        .then_with(|| stem(&a_name).cmp(stem(&b_name)))
        .then_with(|| a_name.cmp(&b_name))
}

fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Walks `root` and returns `(pattern, value)` pairs in matching order
///
/// Only files whose extension is listed are included; dotfiles are skipped.
/// `value` maps a path relative to `root` to the table payload.
pub fn scan_routes(
    root: &Path,
    extensions: &[String],
    value: impl Fn(&str) -> String,
) -> Result<Vec<(String, String)>, Error> {
    let mut routes = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by(compare_entries)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry.map_err(|source| Error::Scan {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext));
        if !matches_extension {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative_str = relative.to_string_lossy().replace('\\', "/");
        let pattern = path_to_route(relative);
        debug!("Discovered route {} -> {}", pattern, relative_str);
        routes.push((pattern, value(&relative_str)));
    }

    Ok(routes)
}

/// Serialized client table with hashed asset names, for the bootstrap globals
pub fn routes_dump(client: &RouteTable, assets: &AssetRegistry) -> ClientRoutes {
    ClientRoutes(
        client
            .routes()
            .map(|(pattern, asset)| (pattern.to_string(), assets.hashed_name(asset)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn test_path_to_route() {
        assert_eq!(path_to_route(&PathBuf::from("index.rs")), "/");
        assert_eq!(path_to_route(&PathBuf::from("about.rs")), "/about");
        assert_eq!(path_to_route(&PathBuf::from("users/index.rs")), "/users");
        assert_eq!(path_to_route(&PathBuf::from("users/[id].rs")), "/users/[id]");
        assert_eq!(
            path_to_route(&PathBuf::from("docs/[[...slug]].js")),
            "/docs/[[...slug]]"
        );
    }

    #[test]
    fn test_segment_rank() {
        assert!(segment_rank("new.rs") < segment_rank("[id].rs"));
        assert!(segment_rank("[id].rs") < segment_rank("[...all].rs"));
        assert!(segment_rank("[...all].rs") < segment_rank("[[...all]].rs"));
    }

    #[test]
    fn test_scan_orders_static_before_dynamic() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for file in [
            "users/[id].rs",
            "users/new.rs",
            "users/index.rs",
            "[...rest].rs",
            "index.rs",
            "about.rs",
            "notes.txt",
            ".hidden.rs",
        ] {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }

        let routes = scan_routes(root, &["rs".to_string()], |rel| format!("pages/{rel}")).unwrap();
        let patterns: Vec<&str> = routes.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            patterns,
            vec!["/about", "/", "/users", "/users/new", "/users/[id]", "/[...rest]"]
        );
        assert_eq!(routes[4].1, "pages/users/[id].rs");
    }

    #[test]
    fn test_scan_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan_routes(&dir.path().join("nope"), &["rs".to_string()], str::to_string);
        assert!(matches!(result, Err(Error::Scan { .. })));
    }
}
