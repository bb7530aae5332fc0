// File: src/server.rs
// Purpose: PageServer, the request-serving engine

use arc_swap::ArcSwap;
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::stream::BoxStream;
use futures::StreamExt;
use rssr_core::{wire, BootstrapState, ClientRoutes, Element, ServerSideProps, Value, PROPS_MEDIA_TYPE};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::actions::{
    decode_args, parse_action_id, ServerActions, MAX_ACTION_BODY, SERVER_ACTION_HEADER, SERVER_ACTION_PATH,
};
use crate::assets::AssetRegistry;
use crate::cache::{ModuleCache, RenderCache};
use crate::error::{ConfigError, Error};
use crate::layout::stack_layouts;
use crate::module::{DataContext, ModuleLoader};
use crate::options::{RouterOptions, ServeOptions, SsrMode};
use crate::render::{RenderEngine, RenderRequest};
use crate::request::{QueryParams, RequestInfo};
use crate::statics;
use crate::table::{routes_dump, scan_routes, RouteTable};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const NO_STORE: &str = "no-store";

/// Route tables, client routes dump and asset registry, swapped as a unit
#[derive(Debug, Default)]
pub struct RouterState {
    /// Pattern → server page module path, e.g. `pages/users/[id].rs`
    pub server: RouteTable,
    /// Pattern → built client asset, e.g. `/pages/users/[id].js`
    pub client: RouteTable,
    pub routes_dump: ClientRoutes,
    pub assets: AssetRegistry,
}

impl RouterState {
    /// Reads the manifest and scans both page trees
    pub fn load(options: &RouterOptions) -> Result<Self, Error> {
        let assets = AssetRegistry::load(&options.manifest_path(), options.hash_style)?;
        let pages_dir = options.pages_dir.as_str();

        let server = RouteTable::new(scan_routes(
            &options.pages_root(),
            &options.server_extensions,
            |relative| format!("{pages_dir}/{relative}"),
        )?)?;
        let client = RouteTable::new(scan_routes(
            &options.client_pages_root(),
            &options.client_extensions,
            |relative| format!("/{pages_dir}/{relative}"),
        )?)?;
        let routes_dump = routes_dump(&client, &assets);

        info!(
            "Loaded {} server routes and {} client routes",
            server.len(),
            client.len()
        );
        Ok(Self {
            server,
            client,
            routes_dump,
            assets,
        })
    }
}

/// Snapshot of both route tables, in matching order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTables {
    pub server: Vec<(String, String)>,
    pub client: Vec<(String, String)>,
}

impl From<&RouterState> for RouteTables {
    fn from(state: &RouterState) -> Self {
        let dump = |table: &RouteTable| {
            table
                .routes()
                .map(|(pattern, value)| (pattern.to_string(), value.clone()))
                .collect()
        };
        Self {
            server: dump(&state.server),
            client: dump(&state.client),
        }
    }
}

/// What [`PageServer::serve`] did with a request
#[derive(Debug)]
pub enum ServeOutcome {
    Response(Response),
    /// No server page matches; the caller decides what happens next
    NoMatch,
    /// The action header named an unknown module or function
    ActionNotFound,
}

impl ServeOutcome {
    /// The response, if the request was handled
    pub fn response(self) -> Option<Response> {
        match self {
            ServeOutcome::Response(response) => Some(response),
            ServeOutcome::NoMatch | ServeOutcome::ActionNotFound => None,
        }
    }
}

/// Serves pages, props, server actions and built assets
pub struct PageServer {
    options: RouterOptions,
    state: ArcSwap<RouterState>,
    loader: Arc<dyn ModuleLoader>,
    renderer: Arc<dyn RenderEngine>,
    actions: ServerActions,
    module_cache: ModuleCache,
    render_cache: Arc<RenderCache>,
    cache_exclude: Vec<glob::Pattern>,
}

impl PageServer {
    /// Loads the manifest and both route tables
    ///
    /// # Errors
    ///
    /// Any scan, pattern or manifest failure.
    pub fn new(
        options: RouterOptions,
        loader: Arc<dyn ModuleLoader>,
        renderer: Arc<dyn RenderEngine>,
    ) -> Result<Self, Error> {
        let state = RouterState::load(&options)?;
        let cache_exclude = options
            .cache_exclude
            .iter()
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    warn!("Ignoring cache exclusion {:?}: {}", pattern, err);
                    None
                }
            })
            .collect();

        Ok(Self {
            options,
            state: ArcSwap::from_pointee(state),
            loader,
            renderer,
            actions: ServerActions::default(),
            module_cache: ModuleCache::default(),
            render_cache: Arc::new(RenderCache::default()),
            cache_exclude,
        })
    }

    pub fn with_actions(mut self, actions: ServerActions) -> Self {
        info!("Registered {} server actions", actions.len());
        self.actions = actions;
        self
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Current route state; in-flight requests keep the snapshot they loaded
    pub fn state(&self) -> Arc<RouterState> {
        self.state.load_full()
    }

    pub fn route_tables(&self) -> RouteTables {
        RouteTables::from(self.state.load().as_ref())
    }

    pub fn render_cache(&self) -> &RenderCache {
        &self.render_cache
    }

    /// Rebuilds the route state and drops cached modules and pages
    ///
    /// A failed reload leaves the current state in place.
    pub fn reload(&self) -> Result<(), Error> {
        let state = RouterState::load(&self.options)?;

        if self.options.module_cache {
            let evicted = self
                .module_cache
                .evict(self.loader.as_ref(), &self.cache_exclude);
            debug!("Evicted {} modules", evicted.len());
        }
        self.state.store(Arc::new(state));
        // Renders that loaded the old state can no longer be cached
        self.render_cache.clear();

        info!("Routes reloaded");
        Ok(())
    }

    /// Drops the cached render of one pathname
    pub fn update_route(&self, pathname: &str) {
        if self.render_cache.remove(pathname) {
            debug!("Evicted cached render of {}", pathname);
        }
    }

    /// Handles one request
    pub async fn serve(&self, request: Request, options: &ServeOptions) -> Result<ServeOutcome, Error> {
        if request.uri().path() == SERVER_ACTION_PATH && request.headers().contains_key(SERVER_ACTION_HEADER) {
            return self.call_action(request).await;
        }

        let (parts, _) = request.into_parts();
        let generation = self.render_cache.generation();
        let state = self.state.load_full();
        if let Some(response) = statics::serve_static(&self.options.build_root(), &state.assets, &parts).await? {
            return Ok(ServeOutcome::Response(response));
        }

        let pathname = parts.uri.path().to_string();
        let search = parts
            .uri
            .query()
            .map(|query| format!("?{query}"))
            .unwrap_or_default();

        let Some(matched) = state.server.match_path(&pathname)? else {
            debug!("No page for {}", pathname);
            return Ok(ServeOutcome::NoMatch);
        };
        let pattern = matched.path.to_string();
        let module_path = matched.value.clone();
        let params = matched.params;

        let client_asset = state
            .client
            .match_path(&pathname)?
            .map(|client| client.value.clone())
            .ok_or_else(|| ConfigError::MissingClientRoute {
                module: module_path.clone(),
            })?;

        let module = self.loader.load(&module_path).await?;
        if self.options.module_cache {
            self.module_cache.record(&module_path);
        }

        let cancel = parts.extensions.get::<CancellationToken>().cloned();
        let info = RequestInfo {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
        };
        let wants_props = info.wants_props();

        let ctx = DataContext {
            params,
            request: info,
            query: QueryParams::parse(&search),
            context: options.context.clone(),
        };
        let ssp = module
            .server_side_props(ctx)
            .await
            .map_err(Error::DataFetch)?;

        if let Some(target) = ssp.as_ref().and_then(|ssp| ssp.redirect.as_deref()) {
            let location = HeaderValue::from_str(target).map_err(|_| ConfigError::InvalidRedirect {
                target: target.to_string(),
            })?;
            debug!("Redirecting {} to {}", pathname, target);
            return Ok(ServeOutcome::Response(
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            ));
        }

        if wants_props {
            let body = wire::to_string(&ssp)?;
            let headers = [
                (header::CONTENT_TYPE, PROPS_MEDIA_TYPE),
                (header::CACHE_CONTROL, NO_STORE),
            ];
            return Ok(ServeOutcome::Response((headers, body).into_response()));
        }

        let cached = self.options.ssr_mode == SsrMode::Cached;
        if cached {
            if let Some(html) = self.render_cache.get(&pathname) {
                debug!("Serving cached render of {}", pathname);
                return Ok(ServeOutcome::Response(html_response(Body::from(html), options)));
            }
        }

        let page = module.component().ok_or_else(|| ConfigError::MissingDefaultExport {
            module: module_path.clone(),
        })?;
        let page_props = ssp
            .as_ref()
            .map(ServerSideProps::page_props)
            .unwrap_or_else(Value::object);
        let mut tree = Element::component(page, page_props, Element::Empty);
        if let Some(layout) = self.options.display_mode.layout() {
            tree = stack_layouts(&pattern, tree, layout, &state.server, self.loader.as_ref()).await?;
        }

        let route = format!("{pathname}{search}");
        let mut shell_props = Value::object();
        if let Some(static_props) = &options.static_props {
            shell_props.merge(static_props);
        }
        if let Some(ssp) = &ssp {
            shell_props.merge(&ssp.to_value());
        }
        shell_props.insert("route", route.as_str());
        let tree = Element::component(options.shell.clone(), shell_props, tree);

        let bootstrap = BootstrapState {
            pages_dir: self.options.pages_dir.clone(),
            initial_route: Some(route),
            routes: state.routes_dump.clone(),
            static_props: options.static_props.clone(),
            server_side_props: ssp,
            display_mode: self.options.display_mode.clone(),
        };
        let mut bootstrap_script = bootstrap.to_script()?;
        if let Some(preload_script) = &options.preload_script {
            bootstrap_script.push(';');
            bootstrap_script.push_str(preload_script);
        }

        let mut roots = options.bootstrap_modules.clone();
        roots.push(client_asset);
        let preloads = state.assets.preloads(&roots);
        let bootstrap_modules = options
            .bootstrap_modules
            .iter()
            .map(|module| state.assets.hashed_name(module))
            .collect();

        let mut stream = self.renderer.render(RenderRequest {
            tree,
            bootstrap_script,
            preloads,
            bootstrap_modules,
            on_error: options.on_error.clone(),
            cancel: cancel.clone(),
        });
        if cached {
            stream = cache_on_completion(stream, self.render_cache.clone(), generation, pathname, cancel);
        }

        let body = if options.streaming {
            Body::from_stream(stream.map(Ok::<_, Infallible>))
        } else {
            let html: Vec<String> = stream.collect().await;
            Body::from(html.concat())
        };
        Ok(ServeOutcome::Response(html_response(body, options)))
    }

    async fn call_action(&self, request: Request) -> Result<ServeOutcome, Error> {
        let id = request
            .headers()
            .get(SERVER_ACTION_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let Some((module, name)) = parse_action_id(&id) else {
            warn!("Malformed server action id {:?}", id);
            return Ok(ServeOutcome::ActionNotFound);
        };
        let Some(action) = self.actions.get(module, name).cloned() else {
            warn!("Server action {}:{} not found", module, name);
            return Ok(ServeOutcome::ActionNotFound);
        };

        let body = match axum::body::to_bytes(request.into_body(), MAX_ACTION_BODY).await {
            Ok(body) => body,
            Err(err) => {
                warn!("Rejected server action {}:{} body: {}", module, name, err);
                let response = (StatusCode::PAYLOAD_TOO_LARGE, "server action body too large").into_response();
                return Ok(ServeOutcome::Response(response));
            }
        };
        let args = match decode_args(&body) {
            Ok(args) => args,
            Err(err) => {
                debug!("Rejected server action {}:{}: {}", module, name, err);
                return Ok(ServeOutcome::Response((StatusCode::BAD_REQUEST, err.to_string()).into_response()));
            }
        };

        debug!("Calling server action {}:{}", module, name);
        let response = match action(args).await {
            Ok(result) => (
                [(header::CONTENT_TYPE, "application/json")],
                result.to_string(),
            )
                .into_response(),
            Err(err) => {
                error!("Server action {}:{} failed: {:#}", module, name, err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        };
        Ok(ServeOutcome::Response(response))
    }
}

fn html_response(body: Body, options: &ServeOptions) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    for (name, value) in &options.headers {
        headers.insert(name, value.clone());
    }
    response
}

/// Passes chunks through and stores the page once the stream completes
fn cache_on_completion(
    mut chunks: BoxStream<'static, String>,
    cache: Arc<RenderCache>,
    generation: u64,
    pathname: String,
    cancel: Option<CancellationToken>,
) -> BoxStream<'static, String> {
    Box::pin(async_stream::stream! {
        let mut html = String::new();
        while let Some(chunk) = chunks.next().await {
            html.push_str(&chunk);
            yield chunk;
        }
        if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return;
        }
        if !cache.insert_at(generation, &pathname, Bytes::from(html)) {
            debug!("Discarded render of {} from before a reload", pathname);
        }
    })
}
