// File: src/host.rs
// Purpose: RouterHost, the client navigation controller

use async_trait::async_trait;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use rssr_core::{BootstrapState, Component, Element, ServerSideProps, Value};
use rssr_router::path::split_path_and_query;
use rssr_router::{PatternError, RouteMatcher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::error::NavigationError;
use crate::history::HistoryInterceptor;
use crate::location::LocationSubscription;

/// Loads the default export of a built page module
#[async_trait]
pub trait ModuleImporter: Send + Sync {
    async fn import(&self, module: &str) -> anyhow::Result<Arc<dyn Component>>;
}

/// Fetches a target's props over the serialized-props channel
#[async_trait]
pub trait PropsFetcher: Send + Sync {
    async fn fetch(&self, target: &str) -> Result<Option<ServerSideProps>, NavigationError>;
}

/// How a [`RouterHost::reload`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The new tree is displayed
    Committed,
    /// A later navigation started first; nothing was committed
    Superseded,
    /// The page redirected; a push to the target was issued instead
    Redirected(String),
}

type RouteHook = Arc<dyn Fn(&str) + Send + Sync>;
type NormalizeUrl = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Keeps the displayed element tree in step with the location
pub struct RouterHost {
    shell: Arc<dyn Component>,
    static_props: Option<Value>,
    routes: RouteMatcher<String>,
    importer: Arc<dyn ModuleImporter>,
    fetcher: Arc<dyn PropsFetcher>,
    history: Arc<HistoryInterceptor>,
    version: AtomicU64,
    displayed: AtomicU64,
    current: watch::Sender<Element>,
    initial_route: Mutex<Option<String>>,
    on_route_updated: Option<RouteHook>,
    normalize_url: NormalizeUrl,
}

impl RouterHost {
    /// Host displaying the pre-rendered `children` for the embedded route
    pub fn new(
        state: &BootstrapState,
        shell: Arc<dyn Component>,
        children: Element,
        importer: Arc<dyn ModuleImporter>,
        fetcher: Arc<dyn PropsFetcher>,
        history: Arc<HistoryInterceptor>,
    ) -> Result<Self, PatternError> {
        let routes = RouteMatcher::new(
            state
                .routes
                .iter()
                .map(|(pattern, module)| (pattern, module.to_string())),
        )?;
        let (current, _) = watch::channel(children);

        Ok(Self {
            shell,
            static_props: state.static_props.clone(),
            routes,
            importer,
            fetcher,
            history,
            version: AtomicU64::new(0),
            displayed: AtomicU64::new(0),
            current,
            initial_route: Mutex::new(state.initial_route.clone()),
            on_route_updated: None,
            normalize_url: Arc::new(str::to_string),
        })
    }

    pub fn on_route_updated(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_route_updated = Some(Arc::new(hook));
        self
    }

    pub fn normalize_url(mut self, normalize: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.normalize_url = Arc::new(normalize);
        self
    }

    /// Receiver of every committed tree
    pub fn subscribe(&self) -> watch::Receiver<Element> {
        self.current.subscribe()
    }

    pub fn current(&self) -> Element {
        self.current.borrow().clone()
    }

    /// Navigations started so far
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Version of the navigation whose tree is displayed
    pub fn displayed_version(&self) -> u64 {
        self.displayed.load(Ordering::SeqCst)
    }

    pub fn initial_route(&self) -> Option<String> {
        self.initial_route
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adopts the pre-rendered tree if `observed` is the route it was
    /// rendered for, otherwise navigates to `observed`
    pub async fn mount(&self, observed: &str) {
        let observed = (self.normalize_url)(observed);
        let adopted = {
            let mut initial = self
                .initial_route
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if initial.as_deref() == Some(observed.as_str()) {
                *initial = None;
                true
            } else {
                false
            }
        };

        if adopted {
            debug!("Adopted server render of {}", observed);
            self.notify(&observed);
        } else {
            self.navigate_or_reload(&observed).await;
        }
    }

    /// Imports the page and fetches its props, then commits unless a newer
    /// navigation started in the meantime
    pub async fn reload(&self, target: &str) -> Result<NavigationOutcome, NavigationError> {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;

        let (pathname, _) = split_path_and_query(target);
        let module = self
            .routes
            .match_path(pathname)
            .ok()
            .flatten()
            .map(|matched| matched.value.clone())
            .ok_or_else(|| NavigationError::NoRoute(pathname.to_string()))?;

        let (page, ssp) = futures::try_join!(self.import(&module), self.fetcher.fetch(target))?;

        if self.version.load(Ordering::SeqCst) != version {
            debug!("Discarding stale navigation to {}", target);
            return Ok(NavigationOutcome::Superseded);
        }

        if let Some(redirect) = ssp.as_ref().and_then(|ssp| ssp.redirect.clone()) {
            debug!("{} redirected to {}", target, redirect);
            self.history.push_state(&redirect);
            return Ok(NavigationOutcome::Redirected(redirect));
        }

        let mut shell_props = Value::object();
        if let Some(static_props) = &self.static_props {
            shell_props.merge(static_props);
        }
        let page_props = match &ssp {
            Some(ssp) => {
                shell_props.merge(&ssp.to_value());
                ssp.page_props()
            }
            None => Value::object(),
        };
        shell_props.insert("route", target);
        let tree = Element::component(
            self.shell.clone(),
            shell_props,
            Element::component(page, page_props, Element::Empty),
        );

        self.displayed.store(version, Ordering::SeqCst);
        self.current.send_replace(tree);
        self.notify(target);
        Ok(NavigationOutcome::Committed)
    }

    /// [`Self::reload`], falling back to a full page load on any error
    pub async fn navigate_or_reload(&self, target: &str) {
        if let Err(err) = self.reload(target).await {
            error!("Navigation to {} failed, reloading page: {}", target, err);
            self.history.assign(target);
        }
    }

    /// Subscribes to the history, mounts at its current location, then
    /// follows it with [`Self::run`]
    ///
    /// A redirect issued while mounting is picked up by the loop.
    pub async fn start(&self) {
        let locations = self.history.subscribe();
        let observed = locations.current().to_string();
        self.mount(&observed).await;
        self.run(locations).await;
    }

    /// Starts a navigation for every new location until the history goes away
    ///
    /// Navigations overlap; only the latest one commits. Pushes made before
    /// `locations` was subscribed are not replayed, so subscribe before
    /// [`Self::mount`] or use [`Self::start`].
    pub async fn run(&self, mut locations: LocationSubscription) {
        let mut in_flight = FuturesUnordered::new();
        loop {
            tokio::select! {
                next = locations.next() => match next {
                    Some(location) => {
                        let target = (self.normalize_url)(&location);
                        in_flight.push(async move { self.navigate_or_reload(&target).await });
                    }
                    None => break,
                },
                Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
            }
        }
        while in_flight.next().await.is_some() {}
    }

    async fn import(&self, module: &str) -> Result<Arc<dyn Component>, NavigationError> {
        self.importer
            .import(module)
            .await
            .map_err(|source| NavigationError::Import {
                module: module.to_string(),
                source,
            })
    }

    fn notify(&self, route: &str) {
        if let Some(hook) = &self.on_route_updated {
            hook(route);
        }
    }
}
