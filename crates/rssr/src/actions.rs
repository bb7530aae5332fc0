// File: src/actions.rs
// Purpose: Server action registry and the request wire format

use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Path of the server action endpoint
pub const SERVER_ACTION_PATH: &str = "/ServerActionGetter";

/// Header naming the action, `/<module>:<function>`
pub const SERVER_ACTION_HEADER: &str = "serveractionid";

/// Export name prefix that marks a function as a server action
pub const ACTION_PREFIX: &str = "Server";

/// Largest server action request body accepted, in bytes
pub const MAX_ACTION_BODY: usize = 2 * 1024 * 1024;

/// A server-only async function invoked with positional JSON arguments
pub type ActionFn =
    Arc<dyn Fn(Vec<JsonValue>) -> BoxFuture<'static, anyhow::Result<JsonValue>> + Send + Sync>;

/// Wraps an async closure as an [`ActionFn`]
pub fn action<F, Fut>(f: F) -> ActionFn
where
    F: Fn(Vec<JsonValue>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<JsonValue>> + Send + 'static,
{
    Arc::new(move |args: Vec<JsonValue>| -> BoxFuture<'static, anyhow::Result<JsonValue>> {
        Box::pin(f(args))
    })
}

/// Named server actions grouped by module path
#[derive(Clone, Default)]
pub struct ServerActions {
    modules: HashMap<String, HashMap<String, ActionFn>>,
}

impl ServerActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one action under `module`
    pub fn register<F, Fut>(&mut self, module: impl Into<String>, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Vec<JsonValue>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<JsonValue>> + Send + 'static,
    {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(name.into(), action(f));
        self
    }

    /// Adds every export of a module whose name starts with `Server`
    pub fn register_module<I, S>(&mut self, module: impl Into<String>, exports: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, ActionFn)>,
        S: Into<String>,
    {
        let module = module.into();
        let actions = self.modules.entry(module.clone()).or_default();
        for (name, f) in exports {
            let name = name.into();
            if name.starts_with(ACTION_PREFIX) {
                actions.insert(name, f);
            } else {
                tracing::debug!("Skipping non-action export {} in {}", name, module);
            }
        }
        self
    }

    /// Looks up an action; `module` is matched without a leading `/`
    pub fn get(&self, module: &str, name: &str) -> Option<&ActionFn> {
        self.modules
            .get(module.strip_prefix('/').unwrap_or(module))?
            .get(name)
    }

    pub fn len(&self) -> usize {
        self.modules.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ServerActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (module, actions) in &self.modules {
            let mut names: Vec<&String> = actions.keys().collect();
            names.sort();
            map.entry(module, &names);
        }
        map.finish()
    }
}

/// Splits a `serveractionid` header into module path and function name
pub fn parse_action_id(id: &str) -> Option<(&str, &str)> {
    let (module, name) = id.split_once(':')?;
    let module = module.strip_prefix('/').unwrap_or(module);
    if module.is_empty() || name.is_empty() {
        return None;
    }
    Some((module, name))
}

/// The action request body could not be decoded
#[derive(Debug, Error)]
pub enum ActionBodyError {
    #[error("action body is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("action body is not a valid encoded URI")]
    Uri,
}

/// Decodes `JSON.stringify(encodeURI(JSON.stringify(args)))`
pub fn decode_args(body: &[u8]) -> Result<Vec<JsonValue>, ActionBodyError> {
    let encoded: String = serde_json::from_slice(body)?;
    let json = decode_uri(&encoded).ok_or(ActionBodyError::Uri)?;
    Ok(serde_json::from_str(&json)?)
}

/// `decodeURI`: percent escapes of reserved characters stay encoded
fn decode_uri(input: &str) -> Option<String> {
    const RESERVED: &[u8] = b";/?:@&=+$,#";

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let hex = bytes.get(i + 1..i + 3)?;
        let byte = u8::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()?;
        if RESERVED.contains(&byte) {
            out.extend_from_slice(&bytes[i..i + 3]);
        } else {
            out.push(byte);
        }
        i += 3;
    }
    String::from_utf8(out).ok()
}
