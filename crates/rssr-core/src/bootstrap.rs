// File: src/bootstrap.rs
// Purpose: Inline bootstrap globals shared between the streamed page and the client

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::props::ServerSideProps;
use crate::wire::{self, Value, WireError};

pub const PAGES_DIR: &str = "__PAGES_DIR__";
pub const INITIAL_ROUTE: &str = "__INITIAL_ROUTE__";
pub const ROUTES: &str = "__ROUTES__";
pub const STATIC_PROPS: &str = "__STATIC_PROPS__";
pub const SERVERSIDE_PROPS: &str = "__SERVERSIDE_PROPS__";
pub const DISPLAY_MODE: &str = "__DISPLAY_MODE__";
pub const LAYOUT_NAME: &str = "__LAYOUT_NAME__";

const NEXTJS: &str = "nextjs";

/// How pages are composed before they reach the shell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// Page directly inside the shell
    #[default]
    Default,
    /// Page nested inside every ancestor layout named `layout`
    NextJs { layout: String },
}

impl DisplayMode {
    /// File stem of the layout module, in nested-layout mode
    pub fn layout(&self) -> Option<&str> {
        match self {
            DisplayMode::Default => None,
            DisplayMode::NextJs { layout } => Some(layout),
        }
    }
}

/// Route pattern of the layout that sits at `prefix`
pub fn layout_route(prefix: &str, layout: &str) -> String {
    if prefix == "/" {
        format!("/{layout}")
    } else {
        format!("{prefix}/{layout}")
    }
}

/// Client route table in registration order
///
/// Serialized as a JSON object whose key order is the table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientRoutes(pub Vec<(String, String)>);

impl ClientRoutes {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, pattern: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == pattern).map(|(_, v)| v)
    }
}

impl Serialize for ClientRoutes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (pattern, asset) in &self.0 {
            map.serialize_entry(pattern, asset)?;
        }
        map.end()
    }
}

struct ClientRoutesVisitor;

impl<'de> Visitor<'de> for ClientRoutesVisitor {
    type Value = ClientRoutes;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of route pattern to asset path")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ClientRoutes, A::Error> {
        let mut routes = Vec::new();
        while let Some(entry) = map.next_entry::<String, String>()? {
            routes.push(entry);
        }
        Ok(ClientRoutes(routes))
    }
}

impl<'de> Deserialize<'de> for ClientRoutes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ClientRoutesVisitor)
    }
}

/// Everything a page embeds for the client to pick up
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootstrapState {
    pub pages_dir: String,
    /// Route the markup was rendered for; cleared once the client mounts
    pub initial_route: Option<String>,
    pub routes: ClientRoutes,
    pub static_props: Option<Value>,
    pub server_side_props: Option<ServerSideProps>,
    pub display_mode: DisplayMode,
}

impl BootstrapState {
    /// Global assignments joined with `;`, in their fixed order
    pub fn to_script(&self) -> Result<String, WireError> {
        let mut statements = vec![
            assign(PAGES_DIR, &self.pages_dir)?,
            assign(INITIAL_ROUTE, &self.initial_route)?,
            assign(ROUTES, &self.routes)?,
        ];
        if let Some(static_props) = &self.static_props {
            statements.push(assign(STATIC_PROPS, static_props)?);
        }
        statements.push(assign(SERVERSIDE_PROPS, &self.server_side_props)?);
        if let DisplayMode::NextJs { layout } = &self.display_mode {
            statements.push(assign(DISPLAY_MODE, NEXTJS)?);
            statements.push(assign(LAYOUT_NAME, layout)?);
        }
        Ok(statements.join(";"))
    }

    /// Reads the globals back out of an inline bootstrap script
    ///
    /// Parsing stops at the first statement that is not a known global
    /// assignment, so trailing caller script is ignored.
    pub fn parse(script: &str) -> Result<Self, WireError> {
        let mut state = BootstrapState::default();
        let mut display_mode: Option<String> = None;
        let mut layout_name: Option<String> = None;
        let mut seen_pages_dir = false;
        let mut seen_routes = false;

        let mut rest = script;
        loop {
            rest = rest.trim_start_matches(|c: char| c == ';' || c.is_whitespace());
            let Some((name, tail)) = rest.split_once('=') else {
                break;
            };
            let tail = tail.trim_start();
            let consumed = match name.trim() {
                PAGES_DIR => {
                    seen_pages_dir = true;
                    read_value(tail, &mut state.pages_dir)?
                }
                INITIAL_ROUTE => read_value(tail, &mut state.initial_route)?,
                ROUTES => {
                    seen_routes = true;
                    read_value(tail, &mut state.routes)?
                }
                STATIC_PROPS => read_value(tail, &mut state.static_props)?,
                SERVERSIDE_PROPS => read_value(tail, &mut state.server_side_props)?,
                DISPLAY_MODE => read_value(tail, &mut display_mode)?,
                LAYOUT_NAME => read_value(tail, &mut layout_name)?,
                _ => break,
            };
            rest = &tail[consumed..];
        }

        if !seen_pages_dir {
            return Err(WireError::MissingGlobal(PAGES_DIR));
        }
        if !seen_routes {
            return Err(WireError::MissingGlobal(ROUTES));
        }

        if display_mode.as_deref() == Some(NEXTJS) {
            state.display_mode = DisplayMode::NextJs {
                layout: layout_name.unwrap_or_else(|| "layout".to_string()),
            };
        }
        Ok(state)
    }
}

fn assign<T: Serialize + ?Sized>(name: &str, value: &T) -> Result<String, WireError> {
    Ok(format!("{name}={}", wire::to_string(value)?))
}

/// Decodes one JSON value from the front of `input`, returning the bytes used
fn read_value<T: DeserializeOwned>(input: &str, slot: &mut T) -> Result<usize, WireError> {
    // Literals and numbers are not self-delimiting; they run to the next `;`.
    if !input.starts_with(|c| matches!(c, '"' | '[' | '{')) {
        let end = input.find(';').unwrap_or(input.len());
        *slot = serde_json::from_str(&input[..end])?;
        return Ok(end);
    }

    let mut stream = serde_json::Deserializer::from_str(input).into_iter::<T>();
    match stream.next() {
        Some(value) => {
            *slot = value?;
            Ok(stream.byte_offset())
        }
        None => Err(WireError::Json(serde::de::Error::custom("missing value"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_layout_route() {
        assert_eq!(layout_route("/", "layout"), "/layout");
        assert_eq!(layout_route("/users/[id]", "layout"), "/users/[id]/layout");
    }

    fn sample() -> BootstrapState {
        BootstrapState {
            pages_dir: "pages".to_string(),
            initial_route: Some("/users/7".to_string()),
            routes: ClientRoutes(vec![
                ("/".to_string(), "/pages/index.js?h1".to_string()),
                ("/users/[id]".to_string(), "/pages/users/[id].js?h2".to_string()),
            ]),
            static_props: None,
            server_side_props: Some(ServerSideProps::props(Value::from("x"))),
            display_mode: DisplayMode::Default,
        }
    }

    #[test]
    fn test_script_order() {
        let script = sample().to_script().unwrap();
        assert_eq!(
            script,
            concat!(
                r#"__PAGES_DIR__="pages";"#,
                r#"__INITIAL_ROUTE__="/users/7";"#,
                r#"__ROUTES__={"/":"/pages/index.js?h1","/users/[id]":"/pages/users/[id].js?h2"};"#,
                r#"__SERVERSIDE_PROPS__={"props":"x"}"#,
            )
        );
    }

    #[test]
    fn test_nested_layout_globals_come_last() {
        let mut state = sample();
        state.static_props = Some(Value::from("s"));
        state.display_mode = DisplayMode::NextJs {
            layout: "layout".to_string(),
        };
        let script = state.to_script().unwrap();
        assert!(script.contains(r#"__STATIC_PROPS__="s";__SERVERSIDE_PROPS__"#));
        assert!(script.ends_with(r#"__DISPLAY_MODE__="nextjs";__LAYOUT_NAME__="layout""#));
    }

    #[test]
    fn test_parse_round_trip() {
        let mut state = sample();
        state.display_mode = DisplayMode::NextJs {
            layout: "frame".to_string(),
        };
        let parsed = BootstrapState::parse(&state.to_script().unwrap()).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_parse_stops_at_trailing_script() {
        let script = format!("{};window.ready = true;", sample().to_script().unwrap());
        let parsed = BootstrapState::parse(&script).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_parse_keeps_route_order() {
        let script = r#"__PAGES_DIR__="p";__ROUTES__={"/z":"/z.js","/a":"/a.js"}"#;
        let parsed = BootstrapState::parse(script).unwrap();
        let order: Vec<&str> = parsed.routes.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["/z", "/a"]);
        assert_eq!(parsed.initial_route, None);
    }

    #[test]
    fn test_parse_requires_routes() {
        let err = BootstrapState::parse(r#"__PAGES_DIR__="p""#).unwrap_err();
        assert!(matches!(err, WireError::MissingGlobal(ROUTES)));
    }

    #[test]
    fn test_script_safe_values() {
        let mut state = sample();
        state.initial_route = Some("/a</script>".to_string());
        let script = state.to_script().unwrap();
        assert!(!script.contains("</script>"));
        let parsed = BootstrapState::parse(&script).unwrap();
        assert_eq!(parsed.initial_route.as_deref(), Some("/a</script>"));
    }
}
