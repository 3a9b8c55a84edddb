//! Tag + selector lookups over a parsed document
//!
//! Callers name a tag and one way of narrowing it down (id, class list, or
//! exact attribute values) and get back the first or all matching elements.

use scraper::{ElementRef, Selector};

/// How a tag lookup is narrowed
#[derive(Debug, Clone, Copy)]
pub enum SelectorKind<'a> {
    /// `id` attribute equals the value
    Id(&'a str),
    /// Element carries every whitespace-separated class in the value
    Class(&'a str),
    /// Each attribute equals its value exactly
    Attrs(&'a [(&'a str, &'a str)]),
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Builds the CSS selector for `tag` narrowed by `kind`
pub fn build_selector(tag: &str, kind: SelectorKind<'_>) -> Option<Selector> {
    let css = match kind {
        SelectorKind::Id(id) => format!("{}[id={}]", tag, quote(id)),
        SelectorKind::Class(classes) => {
            let mut css = tag.to_string();
            for class in classes.split_whitespace() {
                css.push_str(&format!("[class~={}]", quote(class)));
            }
            css
        }
        SelectorKind::Attrs(attrs) => {
            let mut css = tag.to_string();
            for (name, value) in attrs {
                css.push_str(&format!("[{}={}]", name, quote(value)));
            }
            css
        }
    };

    let parsed = match Selector::parse(&css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Invalid selector '{}': {:?}", css, e);
            None
        }
    };
    parsed
}

/// First descendant of `root` matching `tag` and `kind`
pub fn find_first<'a>(
    root: ElementRef<'a>,
    tag: &str,
    kind: SelectorKind<'_>,
) -> Option<ElementRef<'a>> {
    let selector = build_selector(tag, kind)?;
    let found = root.select(&selector).next();
    found
}

/// All descendants of `root` matching `tag` and `kind`, in document order
pub fn find_all<'a>(
    root: ElementRef<'a>,
    tag: &str,
    kind: SelectorKind<'_>,
) -> Vec<ElementRef<'a>> {
    let Some(selector) = build_selector(tag, kind) else {
        return Vec::new();
    };
    let found = root.select(&selector).collect();
    found
}

/// All descendants of `root` with the given tag name
pub fn find_tags<'a>(root: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    let Ok(selector) = Selector::parse(tag) else {
        return Vec::new();
    };
    let found = root.select(&selector).collect();
    found
}

/// Trimmed text content, `None` when blank
pub fn text_of(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
