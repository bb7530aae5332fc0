// File: src/hydrate.rs
// Purpose: Rebuild the server-rendered tree from the embedded bootstrap globals

use rssr_core::{layout_route, BootstrapState, Component, Element, Value};
use rssr_router::path::{split_path_and_query, PathHierarchy};
use rssr_router::RouteMatcher;
use std::sync::Arc;
use tracing::trace;

use crate::error::NavigationError;
use crate::host::ModuleImporter;

/// Element tree matching the streamed markup for `__INITIAL_ROUTE__`
///
/// In nested-layout mode the page is wrapped in every ancestor layout found
/// in the client routes, the root layout outermost.
pub async fn hydrate(
    state: &BootstrapState,
    shell: Arc<dyn Component>,
    importer: &dyn ModuleImporter,
) -> Result<Element, NavigationError> {
    let route = state.initial_route.clone().unwrap_or_else(|| "/".to_string());
    let routes = RouteMatcher::new(state.routes.iter())
        .map_err(|_| NavigationError::NoRoute(route.clone()))?;

    let (pathname, _) = split_path_and_query(&route);
    let matched = routes
        .match_path(pathname)
        .ok()
        .flatten()
        .ok_or_else(|| NavigationError::NoRoute(pathname.to_string()))?;

    let page = import(importer, matched.value).await?;
    let ssp = state.server_side_props.as_ref();
    let page_props = ssp.map(|ssp| ssp.page_props()).unwrap_or_else(Value::object);
    let mut tree = Element::component(page, page_props, Element::Empty);

    if let Some(layout) = state.display_mode.layout() {
        let mut layouts = Vec::new();
        for prefix in PathHierarchy::new(matched.path).root_first() {
            if let Some(module) = state.routes.get(&layout_route(prefix, layout)) {
                trace!("Layout {} applies to {}", module, matched.path);
                layouts.push(import(importer, module).await?);
            }
        }
        tree = layouts.into_iter().rev().fold(tree, |children, layout| {
            Element::component(layout, Value::object(), children)
        });
    }

    let mut shell_props = Value::object();
    if let Some(static_props) = &state.static_props {
        shell_props.merge(static_props);
    }
    if let Some(ssp) = ssp {
        shell_props.merge(&ssp.to_value());
    }
    shell_props.insert("route", route.as_str());
    Ok(Element::component(shell, shell_props, tree))
}

async fn import(importer: &dyn ModuleImporter, module: &str) -> Result<Arc<dyn Component>, NavigationError> {
    importer
        .import(module)
        .await
        .map_err(|source| NavigationError::Import {
            module: module.to_string(),
            source,
        })
}
