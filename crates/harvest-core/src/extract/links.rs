//! Job links on listing pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use dashmap::DashMap;
use regex::Regex;
use scraper::Html;

use crate::error::AppError;
use crate::extract::parse_selector;

/// Compiled id patterns, keyed by their source text.
static ID_PATTERNS: LazyLock<DashMap<&'static str, Regex>> = LazyLock::new(DashMap::new);

fn id_regex(pattern: &'static str) -> Result<Regex, AppError> {
    if let Some(re) = ID_PATTERNS.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)
        .map_err(|e| AppError::Extraction(format!("invalid job id pattern {pattern}: {e}")))?;
    ID_PATTERNS.insert(pattern, re.clone());
    Ok(re)
}

/// How a source marks job anchors on its listing pages.
#[derive(Debug, Clone, Copy)]
pub struct LinkPattern {
    /// CSS selector for candidate anchors.
    pub selector: &'static str,
    /// Attribute holding the href or the job key.
    pub attribute: &'static str,
    /// Regex whose first capture group is the job id.
    pub id_pattern: &'static str,
    /// Builds the canonical detail URL from a job id.
    pub detail_url: fn(&str) -> String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLink {
    pub id: String,
    pub url: String,
}

/// Collect job links in document order, one per job id.
///
/// Anchors whose attribute is missing or does not match `id_pattern` are
/// ignored.
pub fn extract_job_links(document: &Html, pattern: &LinkPattern) -> Result<Vec<JobLink>, AppError> {
    let selector = parse_selector(pattern.selector)?;
    let id_re = id_regex(pattern.id_pattern)?;

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(value) = element.value().attr(pattern.attribute) else {
            continue;
        };
        let Some(id) = id_re
            .captures(value.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };
        if seen.insert(id.clone()) {
            links.push(JobLink {
                url: (pattern.detail_url)(&id),
                id,
            });
        }
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(id: &str) -> String {
        format!("https://jobs.example.com/view/{id}")
    }

    const PATTERN: LinkPattern = LinkPattern {
        selector: "a[href*='/jobs/view/']",
        attribute: "href",
        id_pattern: r"/jobs/view/(?:[^/?]*-)?(\d+)",
        detail_url: detail,
    };

    #[test]
    fn duplicate_anchors_yield_one_link() {
        let doc = Html::parse_document(
            r#"<ul>
                <li><a href="/jobs/view/rust-dev-111?trk=a">Rust dev</a></li>
                <li><a href="/jobs/view/rust-dev-111?trk=b">Rust dev again</a></li>
                <li><a href="https://x.com/jobs/view/222/">Go dev</a></li>
                <li><a href="/jobs/search?x=1">not a job</a></li>
            </ul>"#,
        );
        let links = extract_job_links(&doc, &PATTERN).unwrap();
        assert_eq!(
            links,
            vec![
                JobLink {
                    id: "111".into(),
                    url: "https://jobs.example.com/view/111".into()
                },
                JobLink {
                    id: "222".into(),
                    url: "https://jobs.example.com/view/222".into()
                },
            ]
        );
    }

    #[test]
    fn key_attribute_pattern() {
        fn viewjob(id: &str) -> String {
            format!("https://fr.indeed.com/viewjob?jk={id}")
        }
        let pattern = LinkPattern {
            selector: "a[data-jk]",
            attribute: "data-jk",
            id_pattern: r"^([0-9a-f]+)$",
            detail_url: viewjob,
        };
        let doc = Html::parse_document(
            r#"<a data-jk="abc123">A</a><a data-jk="NOT-HEX">B</a><a data-jk="abc123">A</a>"#,
        );
        let links = extract_job_links(&doc, &pattern).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://fr.indeed.com/viewjob?jk=abc123");
    }

    #[test]
    fn bad_id_pattern_is_an_extraction_error() {
        let pattern = LinkPattern {
            id_pattern: r"/jobs/view/(\d+",
            ..PATTERN
        };
        let doc = Html::parse_document(r#"<a href="/jobs/view/1">A</a>"#);
        let err = extract_job_links(&doc, &pattern).unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
        assert!(!err.is_transport());
    }

    #[test]
    fn compiled_pattern_is_reused() {
        let doc = Html::parse_document(r#"<a href="/jobs/view/7">A</a>"#);
        extract_job_links(&doc, &PATTERN).unwrap();
        assert!(ID_PATTERNS.contains_key(PATTERN.id_pattern));
        assert_eq!(extract_job_links(&doc, &PATTERN).unwrap()[0].id, "7");
    }

    #[test]
    fn empty_listing() {
        let doc = Html::parse_document("<html><body><p>No results</p></body></html>");
        assert!(extract_job_links(&doc, &PATTERN).unwrap().is_empty());
    }
}
