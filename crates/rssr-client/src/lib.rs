//! # rssr Client
//!
//! Client-side navigation for pages streamed by `rssr`:
//! - [`HistoryInterceptor`] makes pushes and replaces observable
//! - [`RouterHost`] refetches props and swaps the element tree, dropping
//!   responses that a newer navigation has overtaken
//! - [`hydrate`] rebuilds the server-rendered tree from the bootstrap globals

pub mod error;
pub mod fetch;
pub mod history;
pub mod host;
pub mod hydrate;
pub mod location;

pub use error::NavigationError;
pub use fetch::HttpPropsFetcher;
pub use history::{
    install, installed, navigate, History, HistoryInterceptor, LocationEvent, LocationKind,
    MemoryHistory,
};
pub use host::{ModuleImporter, NavigationOutcome, PropsFetcher, RouterHost};
pub use hydrate::hydrate;
pub use location::LocationSubscription;
