/// Route module for file-based routing
///
/// `pattern` classifies bracketed segments, `parser` compiles a whole
/// pattern into its matching regex.

pub mod parser;
pub mod pattern;

pub use parser::{Group, RouteRegex};
pub use pattern::{classify_segment, PatternSegmentType};
