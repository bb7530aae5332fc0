/// Compilation of route patterns into anchored regular expressions
///
/// A pattern such as `/users/[id]` is parsed once, when the route table is
/// built. Matching then only runs the compiled regex and decodes captures.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;

use super::pattern::{classify_segment, PatternSegmentType};
use crate::PatternError;

/// Longest cleaned parameter name usable as a named capture group
const MAX_ROUTE_KEY_LEN: usize = 30;

/// Position and shape of one dynamic segment's capture group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    /// 1-based capture group index in [`RouteRegex::re`]
    pub pos: usize,
    /// Captures a `/`-joined list of components
    pub repeat: bool,
    /// May capture nothing
    pub optional: bool,
}

/// A parsed route pattern
#[derive(Debug, Clone)]
pub struct RouteRegex {
    /// Segments in declaration order
    pub segments: Vec<PatternSegmentType>,
    /// Dynamic segment groups, in declaration order
    pub groups: Vec<(String, Group)>,
    /// Compiled matcher, anchored at both ends with an optional trailing slash
    pub re: Regex,
    /// Same matcher written with named capture groups
    pub named_regex: String,
    /// Named-group key → original parameter name
    pub route_keys: BTreeMap<String, String>,
}

impl RouteRegex {
    /// Parses and compiles a normalized route pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use rssr_router::route::parser::RouteRegex;
    ///
    /// let parsed = RouteRegex::parse("/users/[id]").unwrap();
    /// assert_eq!(parsed.re.as_str(), "^/users/([^/]+?)(?:/)?$");
    /// assert_eq!(parsed.named_regex, "^/users/(?P<id>[^/]+?)(?:/)?$");
    /// ```
    ///
    /// # Errors
    ///
    /// Empty or duplicated parameter names are rejected, since they become
    /// keys of the extracted parameters.
    pub fn parse(route: &str) -> Result<Self, PatternError> {
        let trimmed = route.strip_suffix('/').filter(|r| !r.is_empty()).unwrap_or(route);
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);

        let segments = body
            .split('/')
            .map(classify_segment)
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: Vec<(String, Group)> = Vec::new();
        let mut parameterized = String::new();
        let mut named = String::new();
        let mut keys = RouteKeys::default();

        for segment in &segments {
            let Some(name) = segment.param_name() else {
                if let PatternSegmentType::Static(text) = segment {
                    let escaped = format!("/{}", regex::escape(text));
                    parameterized.push_str(&escaped);
                    named.push_str(&escaped);
                }
                continue;
            };

            if groups.iter().any(|(existing, _)| existing == name) {
                return Err(PatternError::DuplicateParamName {
                    route: route.to_string(),
                    name: name.to_string(),
                });
            }

            let key = keys.assign(name);
            let (plain, with_name) = match segment {
                PatternSegmentType::OptionalCatchAll(_) => (
                    "(?:/(.+?))?".to_string(),
                    format!("(?:/(?P<{key}>.+?))?"),
                ),
                PatternSegmentType::CatchAll(_) => {
                    ("/(.+?)".to_string(), format!("/(?P<{key}>.+?)"))
                }
                _ => ("/([^/]+?)".to_string(), format!("/(?P<{key}>[^/]+?)")),
            };
            parameterized.push_str(&plain);
            named.push_str(&with_name);

            groups.push((
                name.to_string(),
                Group {
                    pos: groups.len() + 1,
                    repeat: segment.is_repeated(),
                    optional: segment.is_optional(),
                },
            ));
        }

        let source = format!("^{parameterized}(?:/)?$");
        let re = Regex::new(&source).map_err(|e| PatternError::InvalidRegex {
            route: route.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            segments,
            groups,
            re,
            named_regex: format!("^{named}(?:/)?$"),
            route_keys: keys.into_map(),
        })
    }
}

/// Allocates capture-group names for parameters
///
/// Names are cleaned of non-word characters. Names that end up empty, too
/// long, starting with a digit, or colliding with an earlier key fall back to
/// minimal generated keys built from `a`-`z`.
#[derive(Default)]
struct RouteKeys {
    next_char: u8,
    key_len: usize,
    used: HashSet<String>,
    map: BTreeMap<String, String>,
}

impl RouteKeys {
    fn assign(&mut self, name: &str) -> String {
        let cleaned: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();

        let invalid = cleaned.is_empty()
            || cleaned.len() > MAX_ROUTE_KEY_LEN
            || cleaned.starts_with(|c: char| c.is_ascii_digit())
            || self.used.contains(&cleaned);

        let key = if invalid { self.safe_key() } else { cleaned };
        self.used.insert(key.clone());
        self.map.insert(key.clone(), name.to_string());
        key
    }

    fn safe_key(&mut self) -> String {
        loop {
            if self.key_len == 0 {
                self.key_len = 1;
            }
            let mut key = String::with_capacity(self.key_len);
            for _ in 0..self.key_len {
                key.push(char::from(b'a' + self.next_char));
                self.next_char += 1;
                if self.next_char >= 26 {
                    self.key_len += 1;
                    self.next_char = 0;
                }
            }
            if !self.used.contains(&key) {
                return key;
            }
        }
    }

    fn into_map(self) -> BTreeMap<String, String> {
        self.map
    }
}
