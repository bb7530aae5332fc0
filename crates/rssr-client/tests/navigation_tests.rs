//! Integration tests for RouterHost and hydrate
//!
//! Tests are organized by feature area:
//! - Committing navigations
//! - Stale responses and redirects
//! - Fallback to full page loads
//! - Mounting, the location loop and hydration

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rssr_client::*;
use rssr_core::maud::PreEscaped;
use rssr_core::{
    component, render_to_string, BootstrapState, ClientRoutes, Component, DisplayMode, Element,
    ServerSideProps, Value,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Fixtures
// ============================================================================

fn frame(tag: &'static str) -> Arc<dyn Component> {
    component(tag, move |_, children| {
        Ok(Element::wrap(
            PreEscaped(format!("<{tag}>")),
            children,
            PreEscaped(format!("</{tag}>")),
        ))
    })
}

fn shell() -> Arc<dyn Component> {
    component("Shell", |props, children| {
        let route = props.get("route").and_then(Value::as_str).unwrap_or_default();
        Ok(Element::wrap(
            PreEscaped(format!(r#"<body data-route="{route}">"#)),
            children,
            PreEscaped("</body>".to_string()),
        ))
    })
}

struct Importer {
    modules: HashMap<String, Arc<dyn Component>>,
}

impl Importer {
    fn new() -> Self {
        let user = component("User", |props, _| {
            let id = props.get("id").and_then(Value::as_str).unwrap_or_default();
            Ok(Element::text(format!("user {id}")))
        });
        let modules = HashMap::from([
            ("/pages/users/[id].js".to_string(), user),
            ("/pages/old.js".to_string(), frame("old")),
            ("/pages/boom.js".to_string(), frame("boom")),
            ("/pages/layout.js".to_string(), frame("main")),
            ("/pages/users/layout.js".to_string(), frame("section")),
        ]);
        Self { modules }
    }
}

#[async_trait]
impl ModuleImporter for Importer {
    async fn import(&self, module: &str) -> anyhow::Result<Arc<dyn Component>> {
        self.modules
            .get(module)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("module {module} not built"))
    }
}

/// Props for `/users/<id>`, a redirect for `/old`, a failure for `/boom`
///
/// Fetches for a gated target wait until the gate is opened.
#[derive(Default)]
struct Fetcher {
    gates: HashMap<String, Arc<Notify>>,
}

#[async_trait]
impl PropsFetcher for Fetcher {
    async fn fetch(&self, target: &str) -> Result<Option<ServerSideProps>, NavigationError> {
        if let Some(gate) = self.gates.get(target) {
            gate.notified().await;
        }
        let pathname = target.split('?').next().unwrap_or_default();
        match pathname {
            "/old" => Ok(Some(ServerSideProps::redirect("/users/9"))),
            "/boom" => Err(NavigationError::Fetch {
                target: target.to_string(),
                source: anyhow::anyhow!("server answered 500 Internal Server Error"),
            }),
            _ => {
                let id = pathname.trim_start_matches("/users/");
                let mut props = Value::object();
                props.insert("id", id);
                Ok(Some(ServerSideProps::props(props)))
            }
        }
    }
}

fn state(initial: &str) -> BootstrapState {
    BootstrapState {
        pages_dir: "pages".to_string(),
        initial_route: Some(initial.to_string()),
        routes: ClientRoutes(
            [
                ("/layout", "/pages/layout.js"),
                ("/old", "/pages/old.js"),
                ("/boom", "/pages/boom.js"),
                ("/users/layout", "/pages/users/layout.js"),
                ("/users/[id]", "/pages/users/[id].js"),
            ]
            .into_iter()
            .map(|(pattern, module)| (pattern.to_string(), module.to_string()))
            .collect(),
        ),
        ..BootstrapState::default()
    }
}

struct Harness {
    memory: Arc<MemoryHistory>,
    interceptor: Arc<HistoryInterceptor>,
    routes: Arc<Mutex<Vec<String>>>,
    host: RouterHost,
}

fn harness_with(initial: &str, fetcher: Fetcher) -> Harness {
    let memory = Arc::new(MemoryHistory::new(initial));
    let interceptor = Arc::new(HistoryInterceptor::new(memory.clone()));
    let routes = Arc::new(Mutex::new(Vec::new()));
    let seen = routes.clone();

    let host = RouterHost::new(
        &state(initial),
        shell(),
        Element::text("server render"),
        Arc::new(Importer::new()),
        Arc::new(fetcher),
        interceptor.clone(),
    )
    .unwrap()
    .on_route_updated(move |route| seen.lock().unwrap().push(route.to_string()));

    Harness {
        memory,
        interceptor,
        routes,
        host,
    }
}

fn harness(initial: &str) -> Harness {
    harness_with(initial, Fetcher::default())
}

fn rendered(host: &RouterHost) -> String {
    render_to_string(host.current(), |_| {})
}

// ============================================================================
// Committing navigations
// ============================================================================

#[tokio::test]
async fn test_reload_commits_shell_and_page() {
    let h = harness("/users/1");
    let outcome = h.host.reload("/users/2?tab=posts").await.unwrap();

    assert_eq!(outcome, NavigationOutcome::Committed);
    assert_eq!(
        rendered(&h.host),
        r#"<body data-route="/users/2?tab=posts">user 2</body>"#
    );
    assert_eq!(h.host.displayed_version(), 1);
    assert_eq!(*h.routes.lock().unwrap(), vec!["/users/2?tab=posts"]);
}

#[tokio::test]
async fn test_subscribers_see_commits() {
    let h = harness("/users/1");
    let mut rx = h.host.subscribe();
    h.host.reload("/users/5").await.unwrap();

    assert!(rx.has_changed().unwrap());
    let tree = rx.borrow_and_update().clone();
    assert_eq!(render_to_string(tree, |_| {}), r#"<body data-route="/users/5">user 5</body>"#);
}

// ============================================================================
// Stale responses and redirects
// ============================================================================

#[tokio::test]
async fn test_stale_navigation_is_discarded() {
    let gate = Arc::new(Notify::new());
    let fetcher = Fetcher {
        gates: HashMap::from([("/users/1".to_string(), gate.clone())]),
    };
    let h = harness_with("/", fetcher);

    let slow = h.host.reload("/users/1");
    let fast = async {
        let outcome = h.host.reload("/users/2").await;
        gate.notify_one();
        outcome
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(slow.unwrap(), NavigationOutcome::Superseded);
    assert_eq!(fast.unwrap(), NavigationOutcome::Committed);
    assert_eq!(h.host.version(), 2);
    assert_eq!(h.host.displayed_version(), 2);
    assert_eq!(rendered(&h.host), r#"<body data-route="/users/2">user 2</body>"#);
}

#[tokio::test]
async fn test_redirect_pushes_history() {
    let h = harness("/users/1");
    let mut locations = h.interceptor.subscribe();

    let outcome = h.host.reload("/old").await.unwrap();
    assert_eq!(outcome, NavigationOutcome::Redirected("/users/9".to_string()));
    assert_eq!(h.memory.location(), "/users/9");
    assert_eq!(locations.next().await.as_deref(), Some("/users/9"));
    assert_eq!(rendered(&h.host), "server render");
}

// ============================================================================
// Fallback to full page loads
// ============================================================================

#[tokio::test]
async fn test_fetch_failure_falls_back_to_assign() {
    let h = harness("/users/1");
    h.host.navigate_or_reload("/boom").await;
    h.host.navigate_or_reload("/nowhere/at/all").await;

    assert_eq!(h.memory.assigned(), vec!["/boom", "/nowhere/at/all"]);
    assert_eq!(rendered(&h.host), "server render");
}

#[tokio::test]
async fn test_reload_errors_are_typed() {
    let h = harness("/users/1");
    assert!(matches!(
        h.host.reload("/nowhere").await,
        Err(NavigationError::NoRoute(path)) if path == "/nowhere"
    ));
    assert!(matches!(
        h.host.reload("/boom").await,
        Err(NavigationError::Fetch { .. })
    ));
}

// ============================================================================
// Mounting, the location loop and hydration
// ============================================================================

#[tokio::test]
async fn test_mount_adopts_initial_route() {
    let h = harness("/users/1");
    h.host.mount("/users/1").await;

    assert_eq!(h.host.initial_route(), None);
    assert_eq!(h.host.version(), 0);
    assert_eq!(*h.routes.lock().unwrap(), vec!["/users/1"]);
    assert_eq!(rendered(&h.host), "server render");
}

#[tokio::test]
async fn test_mount_elsewhere_navigates() {
    let h = harness("/users/1");
    h.host.mount("/users/5").await;

    assert_eq!(h.host.initial_route().as_deref(), Some("/users/1"));
    assert_eq!(h.host.version(), 1);
    assert_eq!(rendered(&h.host), r#"<body data-route="/users/5">user 5</body>"#);
}

#[tokio::test]
async fn test_run_follows_history() {
    let h = harness("/users/1");
    let host = Arc::new(h.host);
    let mut rx = host.subscribe();

    let runner = tokio::spawn({
        let host = host.clone();
        let locations = h.interceptor.subscribe();
        async move { host.run(locations).await }
    });

    h.interceptor.push_state("/users/3");
    rx.changed().await.unwrap();
    assert_eq!(rendered(&host), r#"<body data-route="/users/3">user 3</body>"#);

    h.memory.back();
    h.interceptor.notify_popstate();
    rx.changed().await.unwrap();
    assert_eq!(rendered(&host), r#"<body data-route="/users/1">user 1</body>"#);

    runner.abort();
}

#[tokio::test]
async fn test_start_follows_redirect_from_mount() {
    let h = harness("/users/1");
    h.memory.push_state("/old");
    let host = Arc::new(h.host);
    let mut rx = host.subscribe();

    let runner = tokio::spawn({
        let host = host.clone();
        async move { host.start().await }
    });

    tokio::time::timeout(std::time::Duration::from_secs(5), rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.memory.location(), "/users/9");
    assert_eq!(rendered(&host), r#"<body data-route="/users/9">user 9</body>"#);

    runner.abort();
}

#[tokio::test]
async fn test_hydrate_stacks_layouts() {
    let mut bootstrap = state("/users/4?tab=a");
    bootstrap.display_mode = DisplayMode::NextJs {
        layout: "layout".to_string(),
    };
    let mut props = Value::object();
    props.insert("id", "4");
    bootstrap.server_side_props = Some(ServerSideProps::props(props));

    let tree = hydrate(&bootstrap, shell(), &Importer::new()).await.unwrap();
    assert_eq!(
        render_to_string(tree, |_| {}),
        r#"<body data-route="/users/4?tab=a"><main><section>user 4</section></main></body>"#
    );
}

#[tokio::test]
async fn test_hydrate_without_route() {
    let bootstrap = state("/missing");
    let err = hydrate(&bootstrap, shell(), &Importer::new()).await.unwrap_err();
    assert!(matches!(err, NavigationError::NoRoute(path) if path == "/missing"));
}
