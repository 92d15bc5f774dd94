use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];
const PARAGRAPH_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "section"];
const LINE_TAGS: &[&str] = &["br", "li", "div", "tr", "ul", "ol", "dt", "dd"];

/// Collapse runs of whitespace (including newlines) into one space and trim.
///
/// Example: `"  Senior \n\n Rust  dev "` → `"Senior Rust dev"`
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Visible text of an element, whitespace-collapsed.
///
/// Skips `script`, `style` and similar non-rendered subtrees.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_text(element, &mut out, false);
    collapse_whitespace(&out)
}

/// Convert an HTML fragment (e.g. a job description) to plain text,
/// keeping line breaks between blocks and a blank line between paragraphs.
///
/// Plain text input passes through with its line structure intact.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    push_text(fragment.root_element(), &mut out, true);

    let lines: Vec<String> = out
        .replace('\r', "")
        .split('\n')
        .map(|line| WHITESPACE.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    EXCESS_NEWLINES
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

fn push_text(element: ElementRef<'_>, out: &mut String, keep_lines: bool) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                if keep_lines {
                    if PARAGRAPH_TAGS.contains(&name) {
                        out.push_str("\n\n");
                    } else if LINE_TAGS.contains(&name) {
                        out.push('\n');
                    }
                } else {
                    out.push(' ');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_text(child_el, out, keep_lines);
                }
                if keep_lines && PARAGRAPH_TAGS.contains(&name) {
                    out.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
}

/// Truncate to at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// `Some(trimmed)` if the value has non-whitespace content.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
