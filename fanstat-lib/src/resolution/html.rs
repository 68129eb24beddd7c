//! Queries over fetched pages.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static OG_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:description"], meta[name="og:description"]"#).expect("invalid selector"));
static WITH_CLASS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[class]").expect("invalid selector"));

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// The page's `og:description`, where several sites publish their headline counts.
#[must_use]
pub fn og_description(page: &Html) -> Option<String> {
    page.select(&OG_DESCRIPTION)
        .find_map(|meta| meta.value().attr("content"))
        .map(ToString::to_string)
}

/// Text a reader would see, with whitespace collapsed and one space between text nodes.
#[must_use]
pub fn visible_text(page: &Html) -> String {
    let mut words = Vec::new();

    for node in page.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|element| HIDDEN_ELEMENTS.contains(&element.value().name()));
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}

/// Characters a counter widget renders: digits, separators and magnitude suffixes.
const fn is_count_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',' | 'K' | 'M' | 'B')
}

/// Text of the first element carrying one of `classes`, filtered down to count characters.
///
/// Classes are tried in order; for each one the first element carrying it with any
/// count text wins. Odometer-style widgets render one `<span>` per digit, so all text
/// below the element is joined.
#[must_use]
pub fn widget_text(html: &str, classes: &[&str]) -> Option<String> {
    let page = Html::parse_document(html);

    classes.iter().find_map(|class| {
        page.select(&WITH_CLASS)
            .filter(|element| element.value().classes().any(|c| c == *class))
            .map(|element| element.text().flat_map(str::chars).filter(|c| is_count_char(*c)).collect::<String>())
            .find(|text| !text.is_empty())
    })
}
