//! Anti-bot interstitial detection.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::util::{element_text, truncate_chars};

/// Phrases found on challenge and captcha pages, lowercase.
pub const BLOCK_SIGNATURES: &[&str] = &[
    "just a moment",
    "attention required",
    "verify you are human",
    "vérifiez que vous êtes humain",
    "are you a robot",
    "unusual traffic",
    "captcha",
    "security check",
    "access denied",
    "request unsuccessful",
    "checking your browser",
    "please enable cookies",
];

const BODY_SCAN_CHARS: usize = 500;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Return the matched signature if the page looks like a block page.
///
/// Only the `<title>` and the start of the visible body text are scanned,
/// so a job description that merely mentions "captcha" deep in its text
/// does not trip detection.
pub fn detect_block(document: &Html, extra_phrases: &[String]) -> Option<String> {
    let title = document
        .select(&TITLE)
        .next()
        .map(element_text)
        .unwrap_or_default();
    let body = document
        .select(&BODY)
        .next()
        .map(|body| truncate_chars(&element_text(body), BODY_SCAN_CHARS))
        .unwrap_or_default();
    let haystack = format!("{title}\n{body}").to_lowercase();

    if let Some(signature) = BLOCK_SIGNATURES.iter().find(|s| haystack.contains(**s)) {
        return Some((*signature).to_string());
    }
    extra_phrases
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|phrase| !phrase.is_empty())
        .find(|phrase| haystack.contains(phrase.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_title_is_detected() {
        let doc = Html::parse_document(
            "<html><head><title>Just a moment...</title></head><body><p>Checking</p></body></html>",
        );
        assert_eq!(detect_block(&doc, &[]).as_deref(), Some("just a moment"));
    }

    #[test]
    fn body_phrase_is_detected() {
        let doc = Html::parse_document(
            "<html><head><title>Indeed</title></head><body><h2>Vérifiez que vous êtes humain</h2></body></html>",
        );
        assert!(detect_block(&doc, &[]).is_some());
    }

    #[test]
    fn phrase_beyond_scan_window_is_ignored() {
        let filler = "lorem ipsum ".repeat(80);
        let html = format!(
            "<html><head><title>Job</title></head><body><p>{filler}</p><p>We use a captcha provider.</p></body></html>"
        );
        let doc = Html::parse_document(&html);
        assert_eq!(detect_block(&doc, &[]), None);
    }

    #[test]
    fn extra_phrases_are_checked() {
        let doc = Html::parse_document(
            "<html><head><title>Oops</title></head><body>Too many requests from your network</body></html>",
        );
        assert_eq!(detect_block(&doc, &[]), None);
        let extra = vec!["Too Many Requests".to_string()];
        assert_eq!(
            detect_block(&doc, &extra).as_deref(),
            Some("too many requests")
        );
    }

    #[test]
    fn normal_page_passes() {
        let doc = Html::parse_document(
            "<html><head><title>Backend Engineer - Acme</title></head><body><h1>Backend Engineer</h1></body></html>",
        );
        assert_eq!(detect_block(&doc, &[]), None);
    }
}
