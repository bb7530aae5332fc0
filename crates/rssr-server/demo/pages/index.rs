use maud::html;
use rssr::{component, Element, Page};

pub fn page() -> Page {
    Page::new(component("Home", |_, _| {
        Ok(Element::Markup(html! {
            h1 { "rssr" }
            p { "Server-rendered pages with client-side navigation." }
            ul {
                li { a href="/users/1" { "User 1" } }
                li { a href="/docs/getting-started/install" { "Docs" } }
                li { a href="/old" { "An old link" } }
            }
        }))
    }))
}
