// File: src/render.rs
// Purpose: Render engine seam and the default streaming HTML renderer

use futures::stream::BoxStream;
use maud::{html, PreEscaped};
use rssr_core::{Element, RenderChunks, RenderError};
use tokio_util::sync::CancellationToken;

use crate::options::ErrorHook;

/// Everything a render engine needs for one page
pub struct RenderRequest {
    /// Shell-wrapped element tree
    pub tree: Element,
    /// Inline bootstrap script: the globals followed by any caller script
    pub bootstrap_script: String,
    /// Hashed module URLs to preload
    pub preloads: Vec<String>,
    /// Hashed module URLs to load as module scripts
    pub bootstrap_modules: Vec<String>,
    pub on_error: ErrorHook,
    /// Ends the stream at the next chunk boundary once cancelled
    pub cancel: Option<CancellationToken>,
}

/// Turns an element tree into a stream of HTML chunks
pub trait RenderEngine: Send + Sync {
    fn render(&self, request: RenderRequest) -> BoxStream<'static, String>;
}

/// Default engine: flushes at component boundaries, then appends the
/// preload links, the bootstrap script and the module scripts
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingRenderer;

impl StreamingRenderer {
    fn tail(request: &RenderRequest) -> String {
        html! {
            @for href in &request.preloads {
                link rel="modulepreload" href=(href);
            }
            script { (PreEscaped(&request.bootstrap_script)) }
            @for src in &request.bootstrap_modules {
                script type="module" src=(src) {}
            }
        }
        .into_string()
    }
}

impl RenderEngine for StreamingRenderer {
    fn render(&self, request: RenderRequest) -> BoxStream<'static, String> {
        let tail = Self::tail(&request);
        let RenderRequest {
            tree,
            on_error,
            cancel,
            ..
        } = request;

        Box::pin(async_stream::stream! {
            let cancelled = || cancel.as_ref().is_some_and(CancellationToken::is_cancelled);
            let mut chunks = RenderChunks::new(tree, move |err: &RenderError| on_error(err));

            loop {
                if cancelled() {
                    tracing::debug!("Render cancelled");
                    return;
                }
                match chunks.next() {
                    Some(chunk) => yield chunk,
                    None => break,
                }
                tokio::task::yield_now().await;
            }

            if !cancelled() {
                yield tail;
            }
        })
    }
}
