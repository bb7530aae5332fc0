// File: src/module.rs
// Purpose: Page modules and the loader capability that produces them

use async_trait::async_trait;
use futures::future::BoxFuture;
use rssr_core::{Component, ServerSideProps};
use rssr_router::Params;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::LoadError;
use crate::request::{QueryParams, RequestInfo};

/// Everything a data-fetch function receives
#[derive(Clone)]
pub struct DataContext {
    pub params: Params,
    pub request: RequestInfo,
    pub query: QueryParams,
    /// Caller-supplied value from [`crate::ServeOptions::context`]
    pub context: Option<Arc<dyn Any + Send + Sync>>,
}

impl DataContext {
    /// The caller context, if it has type `T`
    pub fn context<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.context.as_deref()?.downcast_ref()
    }
}

/// A loaded page, layout or other route module
#[async_trait]
pub trait PageModule: Send + Sync {
    /// The default export, rendered for the route
    fn component(&self) -> Option<Arc<dyn Component>>;

    /// Server-side data fetch; modules without one render with empty props
    async fn server_side_props(&self, _ctx: DataContext) -> anyhow::Result<Option<ServerSideProps>> {
        Ok(None)
    }
}

/// One static import of a module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// Another module of the project, by module path
    Local(String),
    /// A third-party package; never evicted
    External(String),
}

/// Produces page modules from their module paths
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, path: &str) -> Result<Arc<dyn PageModule>, LoadError>;

    /// Static imports of `path`
    fn dependencies(&self, _path: &str) -> Vec<Dependency> {
        Vec::new()
    }

    /// Drops any cached instance of `path`; the next load produces a fresh one
    fn evict(&self, _path: &str) {}
}

type DataFn =
    Arc<dyn Fn(DataContext) -> BoxFuture<'static, anyhow::Result<Option<ServerSideProps>>> + Send + Sync>;

/// Page module assembled from a component and an optional data-fetch closure
#[derive(Clone, Default)]
pub struct Page {
    component: Option<Arc<dyn Component>>,
    data: Option<DataFn>,
}

impl Page {
    pub fn new(component: Arc<dyn Component>) -> Self {
        Self {
            component: Some(component),
            data: None,
        }
    }

    /// A module without a default export
    pub fn without_component() -> Self {
        Self::default()
    }

    pub fn with_server_side_props<F, Fut>(mut self, fetch: F) -> Self
    where
        F: Fn(DataContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<ServerSideProps>>> + Send + 'static,
    {
        let data: DataFn = Arc::new(
            move |ctx: DataContext| -> BoxFuture<'static, anyhow::Result<Option<ServerSideProps>>> {
                Box::pin(fetch(ctx))
            },
        );
        self.data = Some(data);
        self
    }
}

#[async_trait]
impl PageModule for Page {
    fn component(&self) -> Option<Arc<dyn Component>> {
        self.component.clone()
    }

    async fn server_side_props(&self, ctx: DataContext) -> anyhow::Result<Option<ServerSideProps>> {
        match &self.data {
            Some(fetch) => fetch(ctx).await,
            None => Ok(None),
        }
    }
}

type Factory = Arc<dyn Fn() -> Arc<dyn PageModule> + Send + Sync>;

/// In-process [`ModuleLoader`] backed by registered factories
///
/// A module is instantiated on first load and kept until evicted.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<String, Factory>,
    imports: HashMap<String, Vec<Dependency>>,
    instances: Mutex<HashMap<String, Arc<dyn PageModule>>>,
    loads: Mutex<HashMap<String, usize>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for a module path such as `pages/users/[id].rs`
    pub fn register<F, M>(&mut self, path: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: PageModule + 'static,
    {
        self.factories.insert(
            path.into(),
            Arc::new(move || Arc::new(factory()) as Arc<dyn PageModule>),
        );
        self
    }

    /// Registers a [`Page`]; each instantiation is a clone
    pub fn register_page(&mut self, path: impl Into<String>, page: Page) -> &mut Self {
        self.register(path, move || page.clone())
    }

    /// Declares the static imports of a module
    pub fn with_imports(&mut self, path: impl Into<String>, imports: Vec<Dependency>) -> &mut Self {
        self.imports.insert(path.into(), imports);
        self
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        lock(&self.instances).contains_key(path)
    }

    /// How many times `path` has been instantiated
    pub fn instantiations(&self, path: &str) -> usize {
        lock(&self.loads).get(path).copied().unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn load(&self, path: &str) -> Result<Arc<dyn PageModule>, LoadError> {
        if let Some(module) = lock(&self.instances).get(path) {
            return Ok(module.clone());
        }

        let factory = self
            .factories
            .get(path)
            .ok_or_else(|| LoadError::NotFound(path.to_string()))?;
        let module = factory();

        lock(&self.instances).insert(path.to_string(), module.clone());
        *lock(&self.loads).entry(path.to_string()).or_default() += 1;
        Ok(module)
    }

    fn dependencies(&self, path: &str) -> Vec<Dependency> {
        self.imports.get(path).cloned().unwrap_or_default()
    }

    fn evict(&self, path: &str) {
        lock(&self.instances).remove(path);
    }
}
