// File: src/layout.rs
// Purpose: Next.js style nested layouts around a page element

use rssr_core::{layout_route, Element, Value};
use rssr_router::PathHierarchy;
use std::sync::Arc;
use tracing::trace;

use crate::error::{ConfigError, Error};
use crate::module::ModuleLoader;
use crate::table::RouteTable;

/// Module paths of the layouts that apply to `pattern`, root first
///
/// Every prefix of the pattern is checked, the full pattern included, and
/// prefixes without a layout are skipped.
pub fn layout_modules(pattern: &str, layout: &str, server: &RouteTable) -> Vec<String> {
    PathHierarchy::new(pattern)
        .root_first()
        .into_iter()
        .filter_map(|prefix| server.get(&layout_route(prefix, layout)).cloned())
        .collect()
}

/// Wraps `page` in every applicable layout, the root layout outermost
pub async fn stack_layouts(
    pattern: &str,
    page: Element,
    layout: &str,
    server: &RouteTable,
    loader: &dyn ModuleLoader,
) -> Result<Element, Error> {
    let mut layouts = Vec::new();
    for module_path in layout_modules(pattern, layout, server) {
        let module = loader.load(&module_path).await?;
        let component = module
            .component()
            .ok_or(ConfigError::MissingDefaultExport {
                module: module_path.clone(),
            })?;
        trace!("Layout {} applies to {}", module_path, pattern);
        layouts.push(component);
    }

    Ok(wrap_layouts(layouts, page))
}

/// Nests `page` inside `layouts`, given root first
pub fn wrap_layouts(layouts: Vec<Arc<dyn rssr_core::Component>>, page: Element) -> Element {
    layouts
        .into_iter()
        .rev()
        .fold(page, |children, layout| {
            Element::component(layout, Value::object(), children)
        })
}
