use rssr::{Page, ServerSideProps};

/// Moved page; only ever redirects
pub fn page() -> Page {
    Page::without_component()
        .with_server_side_props(|_| async { Ok(Some(ServerSideProps::redirect("/users/1"))) })
}
