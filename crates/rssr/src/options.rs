// File: src/options.rs
// Purpose: Engine construction options and per-call serving options

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use rssr_core::{Component, DisplayMode, RenderError, Value};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::assets::HashStyle;
use crate::config::{Config, DisplayModeKind};

/// Server-side render caching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SsrMode {
    /// Every request renders
    #[default]
    None,
    /// Rendered HTML is kept per pathname until evicted
    Cached,
}

/// How a [`crate::PageServer`] finds and composes pages
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub base_dir: PathBuf,
    pub pages_dir: String,
    pub build_dir: String,
    pub server_extensions: Vec<String>,
    pub client_extensions: Vec<String>,
    pub display_mode: DisplayMode,
    pub ssr_mode: SsrMode,
    pub hash_style: HashStyle,
    /// Record loaded modules and evict their local imports on reload
    pub module_cache: bool,
    /// Glob patterns of module paths never evicted
    pub cache_exclude: Vec<String>,
}

impl RouterOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let config = Config::default();
        let mut options = Self::from(&config);
        options.base_dir = base_dir.into();
        options
    }

    pub fn with_pages_dir(mut self, pages_dir: impl Into<String>) -> Self {
        self.pages_dir = pages_dir.into();
        self
    }

    pub fn with_build_dir(mut self, build_dir: impl Into<String>) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    pub fn with_display_mode(mut self, display_mode: DisplayMode) -> Self {
        self.display_mode = display_mode;
        self
    }

    pub fn with_ssr_mode(mut self, ssr_mode: SsrMode) -> Self {
        self.ssr_mode = ssr_mode;
        self
    }

    pub fn with_hash_style(mut self, hash_style: HashStyle) -> Self {
        self.hash_style = hash_style;
        self
    }

    pub fn with_module_cache(mut self, exclude: Vec<String>) -> Self {
        self.module_cache = true;
        self.cache_exclude = exclude;
        self
    }

    /// `<base>/<pages>`: server page modules
    pub fn pages_root(&self) -> PathBuf {
        self.base_dir.join(&self.pages_dir)
    }

    /// `<base>/<build>`: bundler output, also the static asset root
    pub fn build_root(&self) -> PathBuf {
        self.base_dir.join(&self.build_dir)
    }

    /// `<base>/<build>/<pages>`: built client page assets
    pub fn client_pages_root(&self) -> PathBuf {
        self.build_root().join(&self.pages_dir)
    }

    /// `<base>/<build>/.meta.json`
    pub fn manifest_path(&self) -> PathBuf {
        self.build_root().join(".meta.json")
    }
}

impl From<&Config> for RouterOptions {
    fn from(config: &Config) -> Self {
        let display_mode = match config.render.display_mode {
            DisplayModeKind::None => DisplayMode::Default,
            DisplayModeKind::Nextjs => DisplayMode::NextJs {
                // "layout.tsx" and "layout" name the same layout
                layout: config
                    .render
                    .layout
                    .split('.')
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            },
        };

        Self {
            base_dir: PathBuf::from(&config.routing.base_dir),
            pages_dir: config.routing.pages_dir.clone(),
            build_dir: config.routing.build_dir.clone(),
            server_extensions: config.routing.server_extensions.clone(),
            client_extensions: config.routing.client_extensions.clone(),
            display_mode,
            ssr_mode: config.render.ssr_mode,
            hash_style: config.render.hash_style,
            module_cache: config.dev.cache_invalidation,
            cache_exclude: config.dev.cache_exclude.clone(),
        }
    }
}

/// Callback receiving render errors
pub type ErrorHook = Arc<dyn Fn(&RenderError) + Send + Sync>;

/// Logs every render error except client-only bailouts
pub fn default_on_error(err: &RenderError) {
    if err.is_client_only() {
        return;
    }
    tracing::error!(error = %err, "render error");
}

/// Per-call options for [`crate::PageServer::serve`]
#[derive(Clone)]
pub struct ServeOptions {
    /// Outermost component; receives `route` and the data-fetch fields
    pub shell: Arc<dyn Component>,
    /// Extra inline script appended after the bootstrap globals
    pub preload_script: Option<String>,
    /// Client entry modules, emitted as module scripts and preloaded
    pub bootstrap_modules: Vec<String>,
    /// Opaque value handed to every data-fetch call
    pub context: Option<Arc<dyn Any + Send + Sync>>,
    pub on_error: ErrorHook,
    /// `false` collects the whole page before responding
    pub streaming: bool,
    /// Extra response headers for HTML responses
    pub headers: HeaderMap,
    pub static_props: Option<Value>,
}

impl ServeOptions {
    pub fn new(shell: Arc<dyn Component>) -> Self {
        Self {
            shell,
            preload_script: None,
            bootstrap_modules: Vec::new(),
            context: None,
            on_error: Arc::new(default_on_error),
            streaming: true,
            headers: HeaderMap::new(),
            static_props: None,
        }
    }

    pub fn with_preload_script(mut self, script: impl Into<String>) -> Self {
        self.preload_script = Some(script.into());
        self
    }

    pub fn with_bootstrap_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bootstrap_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_context<T: Any + Send + Sync>(mut self, context: T) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&RenderError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(hook);
        self
    }

    /// Collect the whole render before responding
    pub fn buffered(mut self) -> Self {
        self.streaming = false;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_static_props(mut self, props: impl Into<Value>) -> Self {
        self.static_props = Some(props.into());
        self
    }
}

impl fmt::Debug for ServeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeOptions")
            .field("shell", &self.shell.name())
            .field("preload_script", &self.preload_script)
            .field("bootstrap_modules", &self.bootstrap_modules)
            .field("streaming", &self.streaming)
            .field("headers", &self.headers)
            .field("static_props", &self.static_props)
            .finish_non_exhaustive()
    }
}
