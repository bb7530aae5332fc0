// File: src/props.rs
// Purpose: Result of a page's server-side data fetch

use serde::{Deserialize, Deserializer, Serialize};

use crate::wire::Value;

/// Media type of the serialized-props channel
pub const PROPS_MEDIA_TYPE: &str = "application/vnd.server-side-props";

/// What a page's data-fetch function hands back to the renderer
///
/// When `redirect` is set no markup is rendered for the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSideProps {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub props: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// A `props` key that is present stays `Some`, even when it holds `null`
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl ServerSideProps {
    /// Props for the page component
    pub fn props(props: impl Into<Value>) -> Self {
        Self {
            props: Some(props.into()),
            redirect: None,
        }
    }

    /// Sends the request elsewhere instead of rendering
    pub fn redirect(to: impl Into<String>) -> Self {
        Self {
            props: None,
            redirect: Some(to.into()),
        }
    }

    /// Props handed to the page component itself
    pub fn page_props(&self) -> Value {
        self.props.clone().unwrap_or_else(Value::object)
    }

    /// Top-level fields as an object, for spreading into shell props
    pub fn to_value(&self) -> Value {
        let mut value = Value::object();
        if let Some(props) = &self.props {
            value.insert("props", props.clone());
        }
        if let Some(redirect) = &self.redirect {
            value.insert("redirect", redirect.as_str());
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_props_wire_shape() {
        let mut props = Value::object();
        props.insert("id", "7");
        let ssp = ServerSideProps::props(props);
        assert_eq!(wire::to_string(&ssp).unwrap(), r#"{"props":{"id":"7"}}"#);
    }

    #[test]
    fn test_redirect_wire_shape() {
        let ssp = ServerSideProps::redirect("/login");
        assert_eq!(wire::to_string(&ssp).unwrap(), r#"{"redirect":"/login"}"#);
    }

    #[test]
    fn test_absent_result_is_null() {
        let none: Option<ServerSideProps> = None;
        assert_eq!(wire::to_string(&none).unwrap(), "null");
        let decoded: Option<ServerSideProps> = wire::from_str("null").unwrap();
        assert_eq!(decoded, None);
    }

    #[test]
    fn test_null_props_survive_the_wire() {
        let ssp = Some(ServerSideProps::props(Value::Null));
        let encoded = wire::to_string(&ssp).unwrap();
        assert_eq!(encoded, r#"{"props":null}"#);

        let decoded: Option<ServerSideProps> = wire::from_str(&encoded).unwrap();
        assert_eq!(decoded, ssp);
        let spread = decoded.map(|ssp| ssp.to_value()).unwrap_or_default();
        assert_eq!(spread.get("props"), Some(&Value::Null));
    }

    #[test]
    fn test_missing_props_stay_absent() {
        let decoded: ServerSideProps = wire::from_str(r#"{"redirect":"/login"}"#).unwrap();
        assert_eq!(decoded, ServerSideProps::redirect("/login"));
    }

    #[test]
    fn test_decode_with_extensions() {
        let decoded: ServerSideProps =
            wire::from_str(r#"{"props":{"score":{"$num":"NaN"}}}"#).unwrap();
        let score = decoded.props.as_ref().and_then(|p| p.get("score"));
        assert!(matches!(score, Some(Value::Float(n)) if n.is_nan()));
    }

    #[test]
    fn test_to_value_spreads_fields() {
        let ssp = ServerSideProps::props(Value::from("x"));
        let value = ssp.to_value();
        assert_eq!(value.get("props"), Some(&Value::from("x")));
        assert_eq!(value.get("redirect"), None);
    }
}
