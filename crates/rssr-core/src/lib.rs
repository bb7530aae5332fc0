//! # rssr Core
//!
//! Types shared by the rssr server engine and the navigation client:
//! - [`Value`] and the JSON-superset wire codec for props
//! - [`ServerSideProps`], the result of a page's data fetch
//! - [`Element`] and [`Component`], the renderable tree
//! - [`BootstrapState`], the globals a streamed page embeds for the client

pub mod bootstrap;
pub mod element;
pub mod props;
pub mod wire;

pub use bootstrap::{layout_route, BootstrapState, ClientRoutes, DisplayMode};
pub use element::{
    component, render_to_string, Component, Element, FnComponent, RenderChunks, RenderError,
    FALLBACK_MARKER,
};
pub use props::{ServerSideProps, PROPS_MEDIA_TYPE};
pub use wire::{Value, WireError};

// Re-export maud so pages and layouts can build markup without a direct dependency
pub use maud;
