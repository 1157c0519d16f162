//! Pre-processing for text that reaches the recipe parser from noisy
//! producers: OCR engines and scraped HTML pages.

use regex::Regex;
use scraper::node::{Element, Node};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

const MERGE_PREV_MAX_LEN: usize = 60;

static OCR_LEADING_L: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^l([/\s])").expect("valid ocr regex"));
static OCR_L_FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bl/(\d)").expect("valid ocr regex"));
static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace regex"));
static ENDS_WITH_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?:;,]$").expect("valid punctuation regex"));

/// Tidy raw OCR output before it is parsed.
///
/// - runs of blank lines collapse to one
/// - one or two character lines without digits are dropped as noise
/// - a misread `l` in quantity position becomes `1` ("l/2 cup", "l cup")
/// - a line starting in lowercase is joined onto a short previous line that
///   does not end in punctuation
pub fn clean_ocr_text(text: &str) -> String {
    let mut cleaned: Vec<String> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();

        if line.is_empty() {
            if cleaned.last().is_some_and(|last| !last.is_empty()) {
                cleaned.push(String::new());
            }
            continue;
        }

        if line.chars().count() <= 2 && !line.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }

        let line = OCR_LEADING_L.replace(line, "1$1");
        let line = OCR_L_FRACTION.replace_all(&line, "1/$1");
        let line = MULTI_SPACE.replace_all(&line, " ").into_owned();

        if let Some(prev) = cleaned.last_mut() {
            let continues = !prev.is_empty()
                && !ENDS_WITH_PUNCTUATION.is_match(prev)
                && line.starts_with(|c: char| c.is_ascii_lowercase())
                && prev.chars().count() < MERGE_PREV_MAX_LEN;
            if continues {
                prev.push(' ');
                prev.push_str(&line);
                continue;
            }
        }

        cleaned.push(line);
    }

    cleaned.join("\n").trim().to_string()
}

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

/// Elements dropped with everything inside them.
const STRIPPED_TAGS: &[&str] = &["script", "style", "noscript", "nav", "footer", "header", "aside"];
/// Elements that end a line of visible text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "table", "section",
    "article", "main", "blockquote", "pre", "br",
];
/// Class or id fragments of ad slots, sidebars, comment threads and share widgets.
const JUNK_MARKERS: &[&str] = &["advertisement", "sidebar", "comment", "social", "share"];

/// True when a class or id marks page furniture. `ad` and `ads` only count as
/// whole dash or underscore segments, so "header" or "shadow" survive.
fn is_page_junk(element: &Element) -> bool {
    element.classes().chain(element.id()).any(|token| {
        let token = token.to_ascii_lowercase();
        JUNK_MARKERS.iter().any(|marker| token.contains(marker))
            || token.split(['-', '_']).any(|part| part == "ad" || part == "ads")
    })
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            Node::Element(el) => {
                let name = el.name();
                if STRIPPED_TAGS.contains(&name) || is_page_junk(el) {
                    continue;
                }
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_visible_text(child_element, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Visible text of an HTML page body, one line per block element.
///
/// The `<head>` is ignored. Scripts, styles, page chrome (nav, header,
/// footer, aside) and ad, sidebar, comment or share containers are skipped so
/// the recipe dominates what is left. Entities are decoded by the parser.
pub fn extract_text_from_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();
    if let Some(body) = document.select(&BODY).next() {
        collect_visible_text(body, &mut text);
    }

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
