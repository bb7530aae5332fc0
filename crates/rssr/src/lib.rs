// rssr - streamed server rendering with file-system routes
// Pages, serialized props, server actions and built assets behind one serve() call

pub mod actions;
pub mod assets;
pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod module;
pub mod options;
pub mod render;
pub mod request;
pub mod statics;
pub mod table;
pub mod watch;

// Engine
pub mod server;

pub use actions::{action, ActionFn, ServerActions, MAX_ACTION_BODY};
pub use assets::{AssetRegistry, HashStyle, Manifest};
pub use cache::{ModuleCache, RenderCache};
pub use config::Config;
pub use error::{ConfigError, Error, LoadError};
pub use module::{DataContext, Dependency, ModuleLoader, ModuleRegistry, Page, PageModule};
pub use options::{default_on_error, ErrorHook, RouterOptions, ServeOptions, SsrMode};
pub use render::{RenderEngine, RenderRequest, StreamingRenderer};
pub use request::{QueryParams, RequestInfo};
pub use server::{PageServer, RouteTables, RouterState, ServeOutcome};
pub use watch::ReloadScheduler;

// Re-export the shared types pages are written against
pub use rssr_core::{
    component, BootstrapState, Component, DisplayMode, Element, RenderError, ServerSideProps, Value,
};
pub use rssr_router::{ParamValue, Params};

pub use axum;
pub use rssr_core::maud;
