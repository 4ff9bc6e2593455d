//! Main-content text extraction from static HTML.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::utils::collapse_whitespace;

/// Elements that never contribute page text.
pub const EXCLUDED_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "form", "button",
];

/// Containers tried in order; the first with any text wins.
const CONTENT_PREFERENCE: &[&str] = &["article", "main", "body"];

/// Extract the primary text of an HTML document.
///
/// Text of every `<article>` is used if there is any, else every `<main>`,
/// else `<body>`, else the whole document. Excluded elements are skipped at
/// any depth and whitespace is collapsed.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for tag in CONTENT_PREFERENCE {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        let mut text = String::new();
        for element in document.select(&selector) {
            collect_text(element, &mut text);
        }
        let text = collapse_whitespace(&text);
        if !text.is_empty() {
            return text;
        }
    }

    let mut text = String::new();
    collect_text(document.root_element(), &mut text);
    collapse_whitespace(&text)
}

fn is_excluded(element: &ElementRef) -> bool {
    EXCLUDED_ELEMENTS.contains(&element.value().name())
}

fn collect_text(element: ElementRef, out: &mut String) {
    if is_excluded(&element) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                    // Separate adjacent block contents; collapsed afterwards.
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}
