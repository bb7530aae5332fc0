use maud::PreEscaped;
use rssr::{component, Element, Page};

/// Root layout, applied in nextjs display mode
pub fn page() -> Page {
    Page::new(component("RootLayout", |_, children| {
        Ok(Element::wrap(
            PreEscaped(r#"<main class="layout">"#.to_string()),
            children,
            PreEscaped("</main>".to_string()),
        ))
    }))
}
