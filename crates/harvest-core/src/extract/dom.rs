//! Selector-based fallback extraction.
//!
//! Each field has an ordered list of selector candidates because sites
//! change markup between releases. A candidate may end in `@attr` to read an
//! attribute instead of the element text (e.g. `time@datetime`).

use scraper::{ElementRef, Html};

use crate::error::AppError;
use crate::extract::parse_selector;
use crate::models::RawJobFields;
use crate::util::{collapse_whitespace, element_text, html_to_text};

/// Ordered selector candidates per field. Empty slices skip the field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSelectors {
    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub contract: &'static [&'static str],
    pub remote: &'static [&'static str],
    pub salary: &'static [&'static str],
    pub description: &'static [&'static str],
    pub requirements: &'static [&'static str],
    pub experience: &'static [&'static str],
    pub education: &'static [&'static str],
    pub posted_at: &'static [&'static str],
}

impl FieldSelectors {
    pub const EMPTY: FieldSelectors = FieldSelectors {
        title: &[],
        company: &[],
        location: &[],
        contract: &[],
        remote: &[],
        salary: &[],
        description: &[],
        requirements: &[],
        experience: &[],
        education: &[],
        posted_at: &[],
    };
}

#[derive(Clone, Copy)]
enum TextMode {
    Collapsed,
    Blocks,
}

fn element_value(element: ElementRef<'_>, attribute: Option<&str>, mode: TextMode) -> String {
    match (attribute, mode) {
        (Some(attr), _) => collapse_whitespace(element.value().attr(attr).unwrap_or_default()),
        (None, TextMode::Collapsed) => element_text(element),
        (None, TextMode::Blocks) => html_to_text(&element.inner_html()),
    }
}

/// Value of the first candidate whose first match has non-empty content.
fn first_value(
    document: &Html,
    candidates: &[&str],
    mode: TextMode,
) -> Result<Option<String>, AppError> {
    for candidate in candidates {
        let (css, attribute) = match candidate.rsplit_once('@') {
            Some((css, attr)) => (css, Some(attr)),
            None => (*candidate, None),
        };
        let selector = parse_selector(css)?;
        if let Some(element) = document.select(&selector).next() {
            let value = element_value(element, attribute, mode);
            if !value.is_empty() {
                return Ok(Some(value));
            }
        }
    }
    Ok(None)
}

/// Read a detail page with selector candidates.
///
/// Returns `Ok(None)` when no title candidate matches: a page without a
/// title is an extraction failure, not a partial record.
pub fn extract_fields(
    document: &Html,
    selectors: &FieldSelectors,
) -> Result<Option<RawJobFields>, AppError> {
    let Some(title) = first_value(document, selectors.title, TextMode::Collapsed)? else {
        return Ok(None);
    };

    let text = |candidates| first_value(document, candidates, TextMode::Collapsed);

    Ok(Some(RawJobFields {
        title: Some(title),
        company: text(selectors.company)?,
        location: text(selectors.location)?,
        contract: text(selectors.contract)?,
        remote: text(selectors.remote)?,
        salary: text(selectors.salary)?,
        currency: None,
        description: first_value(document, selectors.description, TextMode::Blocks)?,
        requirements: first_value(document, selectors.requirements, TextMode::Blocks)?,
        experience: text(selectors.experience)?,
        education: text(selectors.education)?,
        posted_at: text(selectors.posted_at)?,
        url: None,
    }))
}
