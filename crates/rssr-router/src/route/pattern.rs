/// Pattern parsing for route segments
///
/// Pure parsing of bracketed file-system segments into typed segments.
/// All functions are **pure**: same input → same output, no side effects.

use crate::PatternError;

/// Represents the different kinds of route pattern segments
///
/// # Examples
///
/// ```
/// use rssr_router::route::pattern::{classify_segment, PatternSegmentType};
///
/// let seg = classify_segment("about").unwrap();
/// assert!(matches!(seg, PatternSegmentType::Static(_)));
///
/// let seg = classify_segment("[id]").unwrap();
/// assert!(matches!(seg, PatternSegmentType::Required(_)));
///
/// let seg = classify_segment("[...slug]").unwrap();
/// assert!(matches!(seg, PatternSegmentType::CatchAll(_)));
///
/// let seg = classify_segment("[[...slug]]").unwrap();
/// assert!(matches!(seg, PatternSegmentType::OptionalCatchAll(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegmentType {
    /// Literal text, matched after regex escaping
    Static(String),
    /// Single dynamic segment: `[id]`
    Required(String),
    /// Catch-all segment, one or more components: `[...slug]`
    CatchAll(String),
    /// Optional catch-all segment, zero or more components: `[[...slug]]`
    OptionalCatchAll(String),
}

impl PatternSegmentType {
    /// Parameter name for dynamic segments, `None` for static text
    pub fn param_name(&self) -> Option<&str> {
        match self {
            PatternSegmentType::Static(_) => None,
            PatternSegmentType::Required(name)
            | PatternSegmentType::CatchAll(name)
            | PatternSegmentType::OptionalCatchAll(name) => Some(name),
        }
    }

    /// Whether the segment captures a `/`-joined list of components
    pub fn is_repeated(&self) -> bool {
        matches!(
            self,
            PatternSegmentType::CatchAll(_) | PatternSegmentType::OptionalCatchAll(_)
        )
    }

    /// Whether the segment may capture nothing at all
    pub fn is_optional(&self) -> bool {
        matches!(self, PatternSegmentType::OptionalCatchAll(_))
    }
}

/// Classifies a single path segment (pure function)
///
/// # Parsing Rules
///
/// 1. Anything not wrapped in `[...]` is **static**
/// 2. The bracket content may itself be wrapped in `[...]`, marking it optional
/// 3. A leading `...` marks a catch-all
///
/// An inner optional marker without `...` (`[[id]]`) still matches exactly one
/// component, so it classifies as [`PatternSegmentType::Required`].
///
/// # Errors
///
/// Returns [`PatternError::EmptyParamName`] for `[]`, `[...]` and `[[...]]`.
pub fn classify_segment(segment: &str) -> Result<PatternSegmentType, PatternError> {
    let Some(inner) = segment
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    else {
        return Ok(PatternSegmentType::Static(segment.to_string()));
    };

    let (inner, optional) = match inner.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(unwrapped) => (unwrapped, true),
        None => (inner, false),
    };

    let (name, repeat) = match inner.strip_prefix("...") {
        Some(name) => (name, true),
        None => (inner, false),
    };

    if name.is_empty() {
        return Err(PatternError::EmptyParamName {
            segment: segment.to_string(),
        });
    }

    let name = name.to_string();
    Ok(match (repeat, optional) {
        (true, true) => PatternSegmentType::OptionalCatchAll(name),
        (true, false) => PatternSegmentType::CatchAll(name),
        (false, _) => PatternSegmentType::Required(name),
    })
}
