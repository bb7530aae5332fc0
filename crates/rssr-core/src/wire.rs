// File: src/wire.rs
// Purpose: Props value model and its JSON-superset wire encoding

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, DeserializeOwned, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

const DATE_TAG: &str = "$date";
const NUM_TAG: &str = "$num";

/// Errors raised by the props codec
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid wire payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bootstrap script is missing `{0}`")]
    MissingGlobal(&'static str),
}

/// Props value passed from data-fetch functions to components
///
/// A superset of JSON: dates and non-finite floats survive the trip to the
/// browser and back.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Empty object
    pub fn object() -> Self {
        Value::Object(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Field lookup on objects; `None` for every other variant
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Sets a field, turning a non-object into an empty object first
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        if !matches!(self, Value::Object(_)) {
            *self = Value::object();
        }
        if let Value::Object(map) = self {
            map.insert(key.into(), value.into());
        }
    }

    /// Copies the fields of `other` over this object; later keys win
    ///
    /// Non-object values of `other` contribute nothing.
    pub fn merge(&mut self, other: &Value) {
        if let Value::Object(fields) = other {
            for (key, value) in fields {
                self.insert(key.clone(), value.clone());
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn escape_key(key: &str) -> String {
    if key.starts_with('$') {
        format!("${key}")
    } else {
        key.to_string()
    }
}

fn unescape_key(key: String) -> String {
    if key.starts_with("$$") {
        key[1..].to_string()
    } else {
        key
    }
}

fn is_tag(key: &str) -> bool {
    key.starts_with('$') && !key.starts_with("$$")
}

fn non_finite_name(n: f64) -> &'static str {
    if n.is_nan() {
        "NaN"
    } else if n > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Float(n) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(NUM_TAG, non_finite_name(*n))?;
                map.end()
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(date) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(DATE_TAG, &date.to_rfc3339_opts(SecondsFormat::AutoSi, true))?;
                map.end()
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(&escape_key(key), value)?;
                }
                map.end()
            }
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn decode_tag(tag: &str, payload: &Value) -> Result<Value, String> {
    match (tag, payload) {
        (DATE_TAG, Value::String(s)) => parse_date(s)
            .map(Value::Date)
            .map_err(|e| format!("invalid $date `{s}`: {e}")),
        (NUM_TAG, Value::String(s)) => match s.as_str() {
            "NaN" => Ok(Value::Float(f64::NAN)),
            "Infinity" => Ok(Value::Float(f64::INFINITY)),
            "-Infinity" => Ok(Value::Float(f64::NEG_INFINITY)),
            other => Err(format!("invalid $num `{other}`")),
        },
        (DATE_TAG | NUM_TAG, _) => Err(format!("{tag} payload must be a string")),
        _ => Err(format!("unknown wire tag `{tag}`")),
    }
}

/// RFC 3339, plus the signed extended years written outside 0000..=9999
fn parse_date(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%+"))
        .map(|date| date.with_timezone(&Utc))
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a wire-encoded props value")
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E>(self, n: i64) -> Result<Value, E> {
        Ok(Value::Int(n))
    }

    fn visit_u64<E>(self, n: u64) -> Result<Value, E> {
        Ok(i64::try_from(n).map_or(Value::Float(n as f64), Value::Int))
    }

    fn visit_f64<E>(self, n: f64) -> Result<Value, E> {
        Ok(Value::Float(n))
    }

    fn visit_str<E>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            entries.insert(key, value);
        }

        if entries.len() == 1 {
            if let Some((key, payload)) = entries.iter().next() {
                if is_tag(key) {
                    return decode_tag(key, payload).map_err(de::Error::custom);
                }
            }
        }

        Ok(Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (unescape_key(key), value))
                .collect(),
        ))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Makes JSON text safe to embed inside an inline `<script>`
pub fn script_safe(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Encodes any serializable value with the wire format, script-safe
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String, WireError> {
    Ok(script_safe(&serde_json::to_string(value)?))
}

/// Decodes a wire payload
pub fn from_str<T: DeserializeOwned>(payload: &str) -> Result<T, WireError> {
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn round_trip(value: &Value) -> Value {
        from_str(&to_string(value).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_json_is_unchanged() {
        let value = Value::from(serde_json::json!({"a": 1, "b": [true, null, "x"], "c": 1.5}));
        assert_eq!(to_string(&value).unwrap(), r#"{"a":1,"b":[true,null,"x"],"c":1.5}"#);
    }

    #[test]
    fn test_date_round_trip_keeps_nanoseconds() {
        let date = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let value = Value::Date(date);
        let encoded = to_string(&value).unwrap();
        assert_eq!(encoded, r#"{"$date":"2023-11-14T22:13:20.123456789Z"}"#);
        assert_eq!(round_trip(&value), value);
    }

    #[rstest]
    #[case(10000, r#"{"$date":"+10000-01-01T00:00:00Z"}"#)]
    #[case(-44, r#"{"$date":"-0044-01-01T00:00:00Z"}"#)]
    fn test_date_outside_four_digit_years(#[case] year: i32, #[case] expected: &str) {
        let value = Value::Date(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(to_string(&value).unwrap(), expected);
        assert_eq!(round_trip(&value), value);
    }

    #[rstest]
    #[case(f64::NAN, "NaN")]
    #[case(f64::INFINITY, "Infinity")]
    #[case(f64::NEG_INFINITY, "-Infinity")]
    fn test_non_finite_floats(#[case] n: f64, #[case] name: &str) {
        let value = Value::Float(n);
        assert_eq!(to_string(&value).unwrap(), format!(r#"{{"$num":"{name}"}}"#));
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn test_dollar_keys_are_escaped() {
        let mut value = Value::object();
        value.insert("$date", "not a date");
        value.insert("$$x", 1);
        value.insert("plain", 2);

        let encoded = to_string(&value).unwrap();
        assert_eq!(encoded, r#"{"$$$x":1,"$$date":"not a date","plain":2}"#);
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn test_single_escaped_key_is_not_a_tag() {
        let mut value = Value::object();
        value.insert("$num", "NaN");
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let result: Result<Value, _> = from_str(r#"{"$regexp":"a+"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_tag_payload_is_an_error() {
        assert!(from_str::<Value>(r#"{"$date":"yesterday"}"#).is_err());
        assert!(from_str::<Value>(r#"{"$num":"Big"}"#).is_err());
        assert!(from_str::<Value>(r#"{"$num":1}"#).is_err());
    }

    #[test]
    fn test_output_is_script_safe() {
        let value = Value::from("</script>\u{2028}\u{2029}");
        let encoded = to_string(&value).unwrap();
        assert_eq!(encoded, r#""\u003c/script>\u2028\u2029""#);
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn test_int_and_float_stay_distinct() {
        assert_eq!(round_trip(&Value::Int(1)), Value::Int(1));
        assert_eq!(round_trip(&Value::Float(1.0)), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn test_nested_round_trip() {
        let date = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        let mut inner = Value::object();
        inner.insert("when", date);
        inner.insert("ratio", f64::INFINITY);
        let value = Value::Array(vec![inner, Value::Null, Value::from("$")]);
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base = Value::object();
        base.insert("a", 1);
        base.insert("b", 1);
        let mut over = Value::object();
        over.insert("b", 2);
        base.merge(&over);
        assert_eq!(base.get("a"), Some(&Value::Int(1)));
        assert_eq!(base.get("b"), Some(&Value::Int(2)));
    }
}
