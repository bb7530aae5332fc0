// Demo site: pages live under demo/pages so the route scan and the compiled
// modules share one file tree

use maud::{html, PreEscaped, DOCTYPE};
use rssr::{component, Element, ModuleRegistry, ServeOptions, ServerActions, Value};

#[path = "../demo/actions/counter.rs"]
mod counter;
#[path = "../demo/pages/docs/[[...slug]].rs"]
mod docs;
#[path = "../demo/pages/index.rs"]
mod index;
#[path = "../demo/pages/layout.rs"]
mod layout;
#[path = "../demo/pages/old.rs"]
mod old;
#[path = "../demo/pages/users/[id].rs"]
mod user;

/// Every demo page, keyed by module path relative to the site root
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry
        .register_page("pages/index.rs", index::page())
        .register_page("pages/layout.rs", layout::page())
        .register_page("pages/old.rs", old::page())
        .register_page("pages/users/[id].rs", user::page())
        .register_page("pages/docs/[[...slug]].rs", docs::page());
    registry
}

pub fn actions() -> ServerActions {
    let mut actions = ServerActions::new();
    actions.register_module("actions/counter.rs", counter::exports());
    actions
}

/// Document shell around every page
pub fn serve_options() -> ServeOptions {
    let shell = component("Shell", |props: &Value, children| {
        let title = props
            .get("props")
            .and_then(|props| props.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("rssr");
        let head = html! {
            head {
                meta charset="UTF-8";
                title { (title) }
            }
        };
        Ok(Element::wrap(
            PreEscaped(format!(
                r#"{}<html lang="en">{}<body><div id="root">"#,
                DOCTYPE.0,
                head.into_string()
            )),
            children,
            PreEscaped("</div></body></html>".to_string()),
        ))
    });

    ServeOptions::new(shell)
        .with_bootstrap_modules(["/main.js"])
        .with_static_props(site_props())
}

fn site_props() -> Value {
    let mut props = Value::object();
    props.insert("site", "rssr demo");
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::Request;
    use axum::http::{header, Method, StatusCode};
    use axum::response::Response;
    use pretty_assertions::assert_eq;
    use rssr::{DisplayMode, PageServer, RouterOptions, ServeOutcome, StreamingRenderer};
    use std::sync::Arc;

    fn server() -> PageServer {
        let options = RouterOptions::new(concat!(env!("CARGO_MANIFEST_DIR"), "/demo"))
            .with_display_mode(DisplayMode::NextJs {
                layout: "layout".to_string(),
            });
        PageServer::new(options, Arc::new(registry()), Arc::new(StreamingRenderer))
            .unwrap()
            .with_actions(actions())
    }

    async fn respond(server: &PageServer, request: Request) -> Response {
        match server.serve(request, &serve_options()).await.unwrap() {
            ServeOutcome::Response(response) => response,
            other => panic!("expected a response, got {other:?}"),
        }
    }

    async fn page(server: &PageServer, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = respond(server, request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_every_demo_page_is_routed() {
        let tables = server().route_tables();
        let mut patterns: Vec<&str> = tables.server.iter().map(|(pattern, _)| pattern.as_str()).collect();
        patterns.sort();
        assert_eq!(
            patterns,
            vec!["/", "/docs/[[...slug]]", "/layout", "/old", "/users/[id]"]
        );
    }

    #[tokio::test]
    async fn test_user_page_renders_inside_layout() {
        let server = server();
        let (status, html) = page(&server, "/users/3?tab=posts").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>User 3</title>"));
        assert!(html.contains(r#"<main class="layout"><h1>User 3</h1><p>Tab: posts</p>"#));
        assert!(html.contains("/main.js?9f2c1e"));
    }

    #[tokio::test]
    async fn test_docs_catch_all() {
        let server = server();
        let (_, index) = page(&server, "/docs").await;
        assert!(index.contains("<p>Index</p>"));

        let (_, nested) = page(&server, "/docs/getting-started/install").await;
        assert!(nested.contains("<ol><li>getting-started</li><li>install</li></ol>"));
    }

    #[tokio::test]
    async fn test_old_page_redirects() {
        let server = server();
        let request = Request::builder().uri("/old").body(Body::empty()).unwrap();
        let response = respond(&server, request).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/users/1");
    }

    #[tokio::test]
    async fn test_counter_action() {
        let server = server();
        for (by, expected) in [(2, "2"), (3, "5")] {
            let request = Request::builder()
                .method(Method::POST)
                .uri("/ServerActionGetter")
                .header("serveractionid", "/actions/counter.rs:ServerIncrement")
                .body(Body::from(format!(r#""%5B{by}%5D""#)))
                .unwrap();
            let response = respond(&server, request).await;
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(bytes, expected.as_bytes());
        }
    }
}
