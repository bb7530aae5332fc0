mod demo;
mod hot_reload;

use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Router,
};
use rssr::{Config, PageServer, RouterOptions, ServeOptions, ServeOutcome, StreamingRenderer};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    server: Arc<PageServer>,
    options: Arc<ServeOptions>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rssr=debug")),
        )
        .init();

    info!("rssr starting...");

    let config = Config::load_default().unwrap_or_else(|e| {
        warn!("Failed to load config: {:#}, using defaults", e);
        Config::default()
    });
    info!(
        "Port: {}, Pages: {}, Build: {}",
        config.server.port, config.routing.pages_dir, config.routing.build_dir
    );

    let options = RouterOptions::from(&config);
    let server = PageServer::new(options, Arc::new(demo::registry()), Arc::new(StreamingRenderer))
        .context("failed to load routes")?
        .with_actions(demo::actions());
    let server = Arc::new(server);

    let tables = server.route_tables();
    info!("Discovered {} routes", tables.server.len());
    for (pattern, module) in &tables.server {
        info!("  {} -> {}", pattern, module);
    }

    // The watcher must outlive the server loop
    let _watcher = if config.hot_reload_enabled() {
        info!("Hot reload: enabled (watching the build manifest)");
        match hot_reload::spawn(server.clone(), &config) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Failed to create file watcher: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let mut serve_options = demo::serve_options();
    if !config.render.streaming {
        serve_options = serve_options.buffered();
    }
    let state = AppState {
        server,
        options: Arc::new(serve_options),
    };

    let app = Router::new().fallback(handle).with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Every request goes through the page server
async fn handle(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    match state.server.serve(request, &state.options).await {
        Ok(ServeOutcome::Response(response)) => response,
        Ok(ServeOutcome::NoMatch) => error_response(
            StatusCode::NOT_FOUND,
            "Page Not Found",
            &format!("Route '{}' not found", path),
        ),
        Ok(ServeOutcome::ActionNotFound) => (StatusCode::NOT_FOUND, "server action not found").into_response(),
        Err(err) => err.into_response(),
    }
}

fn error_response(status: StatusCode, title: &str, message: &str) -> Response {
    let markup = maud::html! {
        (maud::DOCTYPE)
        html {
            head { title { (title) } }
            body {
                h1 { (status.as_u16()) " " (title) }
                p { (message) }
                a href="/" { "Go Home" }
            }
        }
    };
    (status, Html(markup.into_string())).into_response()
}
