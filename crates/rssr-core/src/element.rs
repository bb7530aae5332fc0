// File: src/element.rs
// Purpose: Element tree, component trait and the chunked render walk

use maud::{html, Markup, PreEscaped};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::wire::Value;

/// Marker emitted in place of a subtree that failed to render
pub const FALLBACK_MARKER: &str = "<template data-rssr-fallback></template>";

/// A component could not produce its element tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The component only renders in the browser
    #[error("component `{component}` only renders on the client")]
    ClientOnly { component: String },

    #[error("component `{component}` failed to render: {message}")]
    Component { component: String, message: String },
}

impl RenderError {
    pub fn client_only(component: impl Into<String>) -> Self {
        RenderError::ClientOnly {
            component: component.into(),
        }
    }

    pub fn component(component: impl Into<String>, message: impl fmt::Display) -> Self {
        RenderError::Component {
            component: component.into(),
            message: message.to_string(),
        }
    }

    pub fn is_client_only(&self) -> bool {
        matches!(self, RenderError::ClientOnly { .. })
    }
}

/// Anything that turns props and children into an element tree
///
/// Pages, layouts and shells are all components.
pub trait Component: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    fn render(&self, props: &Value, children: Element) -> Result<Element, RenderError>;
}

/// Component backed by a closure
pub struct FnComponent<F> {
    name: String,
    render: F,
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&Value, Element) -> Result<Element, RenderError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, props: &Value, children: Element) -> Result<Element, RenderError> {
        (self.render)(props, children)
    }
}

/// Wraps a closure as a shareable component
pub fn component<F>(name: impl Into<String>, render: F) -> Arc<dyn Component>
where
    F: Fn(&Value, Element) -> Result<Element, RenderError> + Send + Sync + 'static,
{
    Arc::new(FnComponent {
        name: name.into(),
        render,
    })
}

/// Node of a renderable tree
#[derive(Clone, Default)]
pub enum Element {
    #[default]
    Empty,
    /// Text, escaped on output
    Text(String),
    /// Pre-escaped markup
    Markup(Markup),
    Fragment(Vec<Element>),
    Component {
        component: Arc<dyn Component>,
        props: Value,
        children: Box<Element>,
    },
}

impl Element {
    pub fn text(text: impl Into<String>) -> Self {
        Element::Text(text.into())
    }

    /// Component node with the given props and children
    pub fn component(component: Arc<dyn Component>, props: Value, children: Element) -> Self {
        Element::Component {
            component,
            props,
            children: Box::new(children),
        }
    }

    /// `children` between an opening and closing piece of markup
    pub fn wrap(open: Markup, children: Element, close: Markup) -> Self {
        Element::Fragment(vec![
            Element::Markup(open),
            children,
            Element::Markup(close),
        ])
    }

    /// Raw HTML that is trusted as-is
    pub fn raw(html: impl Into<String>) -> Self {
        Element::Markup(PreEscaped(html.into()))
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Empty => f.write_str("Empty"),
            Element::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Element::Markup(markup) => f.debug_tuple("Markup").field(&markup.0).finish(),
            Element::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Element::Component {
                component,
                props,
                children,
            } => f
                .debug_struct("Component")
                .field("name", &component.name())
                .field("props", props)
                .field("children", children)
                .finish(),
        }
    }
}

impl From<Markup> for Element {
    fn from(markup: Markup) -> Self {
        Element::Markup(markup)
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::text(text)
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::Text(text)
    }
}

impl From<Vec<Element>> for Element {
    fn from(children: Vec<Element>) -> Self {
        Element::Fragment(children)
    }
}

/// Depth-first walk that yields HTML in chunks
///
/// Buffered output is flushed whenever the walk reaches a component, so
/// each chunk ends at a component boundary. A component that fails is
/// reported to `on_error` and replaced by [`FALLBACK_MARKER`].
pub struct RenderChunks<F> {
    stack: Vec<Element>,
    buf: String,
    on_error: F,
}

impl<F: FnMut(&RenderError)> RenderChunks<F> {
    pub fn new(root: Element, on_error: F) -> Self {
        Self {
            stack: vec![root],
            buf: String::new(),
            on_error,
        }
    }

    fn take(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

impl<F: FnMut(&RenderError)> Iterator for RenderChunks<F> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some(element) = self.stack.pop() {
            match element {
                Element::Empty => {}
                Element::Text(text) => self.buf.push_str(&html! { (text) }.into_string()),
                Element::Markup(markup) => self.buf.push_str(&markup.into_string()),
                Element::Fragment(children) => self.stack.extend(children.into_iter().rev()),
                Element::Component {
                    component,
                    props,
                    children,
                } => {
                    if !self.buf.is_empty() {
                        self.stack.push(Element::Component {
                            component,
                            props,
                            children,
                        });
                        return self.take();
                    }
                    match component.render(&props, *children) {
                        Ok(rendered) => self.stack.push(rendered),
                        Err(err) => {
                            (self.on_error)(&err);
                            self.buf.push_str(FALLBACK_MARKER);
                        }
                    }
                }
            }
        }
        self.take()
    }
}

/// Renders a whole tree into one string
pub fn render_to_string(root: Element, on_error: impl FnMut(&RenderError)) -> String {
    RenderChunks::new(root, on_error).collect()
}
