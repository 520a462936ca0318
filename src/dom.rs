//! DOM helpers shared by listing-card harvesting and detail extraction.

use crate::utils::{non_empty, normalize_ws};
use scraper::{ElementRef, Html, Node, Selector};

/// Compile a fixed selector list. Only ever called on literals.
pub fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

const INVISIBLE: &[&str] = &["script", "style", "noscript", "template"];

/// Elements whose boundaries separate words. Text inside inline markup is
/// joined as-is.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol",
    "p", "pre", "section", "table", "tbody", "td", "th", "thead", "title", "tr", "ul",
];

/// Visible text of an element.
///
/// Text nodes are concatenated without a separator, as a browser renders
/// inline markup. A space is inserted only where text crosses into a
/// different block element or follows a `<br>`. Script, style and noscript
/// content is dropped. Whitespace is normalized.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    let mut current_block = None;
    let mut started = false;
    let mut line_break = false;

    for node in element.descendants() {
        match node.value() {
            Node::Element(e) if e.name() == "br" => line_break = true,
            Node::Text(text) => {
                let mut block = None;
                let mut hidden = false;
                for ancestor in node.ancestors() {
                    if let Some(e) = ancestor.value().as_element() {
                        if INVISIBLE.contains(&e.name()) {
                            hidden = true;
                            break;
                        }
                        if block.is_none() && BLOCK.contains(&e.name()) {
                            block = Some(ancestor.id());
                        }
                    }
                }
                if hidden {
                    continue;
                }
                if started && (line_break || block != current_block) {
                    out.push(' ');
                }
                out.push_str(text);
                current_block = block;
                started = true;
                line_break = false;
            }
            _ => {}
        }
    }
    normalize_ws(&out)
}

/// Normalized visible text of the whole document.
pub fn visible_text(html: &Html) -> String {
    element_text(html.root_element())
}

/// First non-blank text among `selectors`, tried in order, within `scope`.
pub fn first_text_in(scope: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        scope
            .select(sel)
            .next()
            .and_then(|el| non_empty(&element_text(el)))
    })
}

/// First non-blank text among `selectors` anywhere in the document.
pub fn first_text(html: &Html, selectors: &[Selector]) -> Option<String> {
    first_text_in(html.root_element(), selectors)
}

/// Inner HTML of the first matching element whose content is not blank.
pub fn first_inner_html(html: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        html.select(sel).next().and_then(|el| {
            let inner = el.inner_html();
            non_empty(&inner).map(|_| inner.trim().to_string())
        })
    })
}
