//! # rssr Router
//!
//! File-system route patterns compiled to anchored regular expressions:
//! - Static segments (`/about`)
//! - Dynamic segments (`/users/[id]`)
//! - Catch-all segments (`/docs/[...slug]`)
//! - Optional catch-all segments (`/docs/[[...slug]]`)
//!
//! ## Matching Order
//!
//! Routes are tried in the order they were registered and the first
//! structural match wins. There is no specificity-based reordering, so a
//! table builder must register static routes before the dynamic routes they
//! overlap with.
//!
//! ## Example
//!
//! ```
//! use rssr_router::{ParamValue, RouteMatcher};
//!
//! let matcher = RouteMatcher::new([
//!     ("/users/new", "new.js"),
//!     ("/users/[id]", "user.js"),
//! ])
//! .unwrap();
//!
//! let matched = matcher.match_path("/users/123").unwrap().unwrap();
//! assert_eq!(matched.path, "/users/[id]");
//! assert_eq!(*matched.value, "user.js");
//! assert_eq!(matched.params.get("id"), Some(&ParamValue::from("123")));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod path;
pub mod route;

pub use path::{decode_component, split_path_and_query, PathHierarchy};
pub use route::{classify_segment, Group, PatternSegmentType, RouteRegex};

// ============================================================================
// Errors
// ============================================================================

/// A route pattern could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("empty parameter name in segment `{segment}`")]
    EmptyParamName { segment: String },
    #[error("parameter `{name}` declared twice in route `{route}`")]
    DuplicateParamName { route: String, name: String },
    #[error("route `{route}` compiled to an invalid regex: {message}")]
    InvalidRegex { route: String, message: String },
}

/// A matched path could not be turned into parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("failed to decode param `{param}` from `{value}`")]
    Decode { param: String, value: String },
}

// ============================================================================
// Parameters
// ============================================================================

/// Value of one extracted path parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Single dynamic segment
    Single(String),
    /// Catch-all segment, one entry per path component
    Repeated(Vec<String>),
}

impl ParamValue {
    /// The value of a single dynamic segment
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(value) => Some(value),
            ParamValue::Repeated(_) => None,
        }
    }

    /// The components of a catch-all segment
    pub fn as_slice(&self) -> Option<&[String]> {
        match self {
            ParamValue::Single(_) => None,
            ParamValue::Repeated(values) => Some(values),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Repeated(values.into_iter().map(str::to_string).collect())
    }
}

/// Parameters extracted by a match, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Shortcut for single dynamic segments
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(ParamValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, ParamValue> {
        self.0
    }
}

// ============================================================================
// Route Table
// ============================================================================

#[derive(Debug, Clone)]
struct CompiledRoute<T> {
    path: String,
    regex: RouteRegex,
    value: T,
}

impl<T> CompiledRoute<T> {
    fn extract(&self, pathname: &str) -> Result<Option<Params>, MatchError> {
        let Some(captures) = self.regex.re.captures(pathname) else {
            return Ok(None);
        };

        let mut params = BTreeMap::new();
        for (name, group) in &self.regex.groups {
            let Some(raw) = captures.get(group.pos).map(|m| m.as_str()) else {
                continue;
            };

            let decode = |piece: &str| {
                decode_component(piece).ok_or_else(|| MatchError::Decode {
                    param: name.clone(),
                    value: raw.to_string(),
                })
            };

            let value = if raw.contains('/') {
                ParamValue::Repeated(raw.split('/').map(decode).collect::<Result<_, _>>()?)
            } else if group.repeat {
                ParamValue::Repeated(vec![decode(raw)?])
            } else {
                ParamValue::Single(decode(raw)?)
            };
            params.insert(name.clone(), value);
        }

        Ok(Some(Params(params)))
    }
}

/// Result of matching a path against a [`RouteMatcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRoute<'a, T> {
    /// Canonical pattern of the matched route, e.g. `/users/[id]`
    pub path: &'a str,
    /// Payload registered for the pattern
    pub value: &'a T,
    /// Decoded parameters
    pub params: Params,
}

/// Ordered table of compiled route patterns
#[derive(Debug, Clone)]
pub struct RouteMatcher<T> {
    routes: Vec<CompiledRoute<T>>,
}

impl<T> RouteMatcher<T> {
    /// Compiles every pattern, keeping the given order
    ///
    /// # Errors
    ///
    /// Fails on the first pattern that cannot be compiled.
    pub fn new<I, S>(entries: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
    {
        let routes = entries
            .into_iter()
            .map(|(path, value)| {
                let path = path.into();
                RouteRegex::parse(&path).map(|regex| CompiledRoute { path, regex, value })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { routes })
    }

    /// Returns the first route, in table order, whose pattern matches `pathname`
    ///
    /// `pathname` must not carry a query string; see [`split_path_and_query`].
    ///
    /// # Errors
    ///
    /// A parameter that fails percent-decoding aborts the whole match.
    pub fn match_path(&self, pathname: &str) -> Result<Option<MatchedRoute<'_, T>>, MatchError> {
        for route in &self.routes {
            if let Some(params) = route.extract(pathname)? {
                return Ok(Some(MatchedRoute {
                    path: &route.path,
                    value: &route.value,
                    params,
                }));
            }
        }
        Ok(None)
    }

    /// Payload registered for an exact pattern
    pub fn get(&self, pattern: &str) -> Option<&T> {
        self.routes
            .iter()
            .find(|route| route.path == pattern)
            .map(|route| &route.value)
    }

    /// Parsed form of an exact pattern
    pub fn regex(&self, pattern: &str) -> Option<&RouteRegex> {
        self.routes
            .iter()
            .find(|route| route.path == pattern)
            .map(|route| &route.regex)
    }

    /// Patterns and payloads in table order
    pub fn routes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.routes.iter().map(|route| (route.path.as_str(), &route.value))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<T> Default for RouteMatcher<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}
