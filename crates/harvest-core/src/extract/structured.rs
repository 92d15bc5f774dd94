//! JSON-LD `JobPosting` extraction.
//!
//! Pages embed schema.org data in `<script type="application/ld+json">`.
//! A script may hold one object, an array, or an `@graph`; every object is a
//! candidate and the first one typed `JobPosting` is used. Blocks that fail
//! to parse are skipped.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::{CrawlRequest, ExperienceLevel, RawJobFields};
use crate::util::{collapse_whitespace, html_to_text};

static LD_JSON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

const JOB_POSTING_TYPE: &str = "JobPosting";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    // Tried first: derived structs also accept sequences.
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.first(),
        }
    }

    fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamedThing {
    Name(String),
    Object { name: Option<String> },
}

impl NamedThing {
    fn name(&self) -> Option<&str> {
        match self {
            NamedThing::Name(name) => Some(name),
            NamedThing::Object { name } => name.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Address {
    Text(String),
    Postal(PostalAddress),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostalAddress {
    address_locality: Option<String>,
    address_region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Place {
    address: Option<Address>,
}

impl Place {
    fn locality(&self) -> Option<String> {
        match self.address.as_ref()? {
            Address::Text(text) => Some(text.clone()),
            Address::Postal(postal) => postal
                .address_locality
                .clone()
                .filter(|l| !l.trim().is_empty())
                .or_else(|| postal.address_region.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn as_text(&self) -> String {
        match self {
            Amount::Number(n) => n.to_string(),
            Amount::Text(t) => t.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SalaryValue {
    Amount(Amount),
    Quantity {
        #[serde(rename = "minValue")]
        min_value: Option<Amount>,
        value: Option<Amount>,
    },
}

#[derive(Debug, Deserialize)]
struct MonetaryAmount {
    currency: Option<String>,
    value: Option<SalaryValue>,
}

impl MonetaryAmount {
    fn amount_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            SalaryValue::Amount(amount) => Some(amount.as_text()),
            SalaryValue::Quantity { min_value, value } => {
                min_value.as_ref().or(value.as_ref()).map(Amount::as_text)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Requirement {
    Text(String),
    Object(RequirementObject),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequirementObject {
    months_of_experience: Option<f64>,
    credential_category: Option<String>,
    description: Option<String>,
}

impl Requirement {
    fn as_experience(&self) -> Option<String> {
        match self {
            Requirement::Text(text) => Some(text.clone()),
            Requirement::Object(obj) => obj
                .months_of_experience
                .map(|m| months_to_tier(m).as_str().to_string())
                .or_else(|| obj.description.clone()),
        }
    }

    fn as_education(&self) -> Option<String> {
        match self {
            Requirement::Text(text) => Some(text.clone()),
            Requirement::Object(obj) => obj
                .credential_category
                .clone()
                .or_else(|| obj.description.clone()),
        }
    }
}

/// Tier for a `monthsOfExperience` figure.
fn months_to_tier(months: f64) -> ExperienceLevel {
    match months {
        m if m < 12.0 => ExperienceLevel::Internship,
        m if m < 36.0 => ExperienceLevel::Junior,
        m if m < 60.0 => ExperienceLevel::Mid,
        m if m < 120.0 => ExperienceLevel::Senior,
        _ => ExperienceLevel::Lead,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobPostingBlock {
    title: Option<String>,
    hiring_organization: Option<NamedThing>,
    job_location: Option<OneOrMany<Place>>,
    job_location_type: Option<String>,
    employment_type: Option<OneOrMany<String>>,
    base_salary: Option<MonetaryAmount>,
    description: Option<String>,
    date_posted: Option<String>,
    experience_requirements: Option<Requirement>,
    education_requirements: Option<Requirement>,
    url: Option<String>,
}

impl From<JobPostingBlock> for RawJobFields {
    fn from(block: JobPostingBlock) -> Self {
        RawJobFields {
            title: block.title.map(|t| collapse_whitespace(&t)),
            company: block
                .hiring_organization
                .as_ref()
                .and_then(NamedThing::name)
                .map(str::to_string),
            location: block
                .job_location
                .as_ref()
                .and_then(OneOrMany::first)
                .and_then(Place::locality),
            contract: block.employment_type.as_ref().map(|types| {
                types
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            }),
            remote: block
                .job_location_type
                .filter(|t| t.eq_ignore_ascii_case("TELECOMMUTE"))
                .map(|_| "Remote".to_string()),
            salary: block.base_salary.as_ref().and_then(MonetaryAmount::amount_text),
            currency: block.base_salary.as_ref().and_then(|s| s.currency.clone()),
            description: block.description.map(|d| html_to_text(&d)),
            requirements: None,
            experience: block
                .experience_requirements
                .as_ref()
                .and_then(Requirement::as_experience),
            education: block
                .education_requirements
                .as_ref()
                .and_then(Requirement::as_education),
            posted_at: block.date_posted,
            url: block.url,
        }
    }
}

fn is_job_posting(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind == JOB_POSTING_TYPE,
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some(JOB_POSTING_TYPE)),
        _ => false,
    }
}

/// Flatten one parsed script into candidate objects.
fn candidates(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.into_iter().flat_map(candidates).collect(),
        Value::Object(mut map) => match map.remove("@graph") {
            Some(graph) => {
                let mut out = candidates(graph);
                if map.contains_key("@type") {
                    out.insert(0, Value::Object(map));
                }
                out
            }
            None => vec![Value::Object(map)],
        },
        _ => Vec::new(),
    }
}

/// Parse the first `JobPosting` block of a page into raw fields.
///
/// Shaped like a [`DetailStrategy`](super::DetailStrategy).
pub fn extract_job_posting(
    document: &Html,
    request: &CrawlRequest,
) -> Result<Option<RawJobFields>, AppError> {
    for script in document.select(&LD_JSON) {
        let text = script.text().collect::<String>();
        let value: Value = match serde_json::from_str(text.trim()) {
            Ok(value) => value,
            Err(e) => {
                let err = AppError::MalformedBlock(e.to_string());
                tracing::debug!(url = %request.url, error = %err, "Skipping structured block");
                continue;
            }
        };

        for candidate in candidates(value).into_iter().filter(is_job_posting) {
            match serde_json::from_value::<JobPostingBlock>(candidate) {
                Ok(block) => return Ok(Some(RawJobFields::from(block))),
                Err(e) => {
                    let err = AppError::MalformedBlock(e.to_string());
                    tracing::debug!(url = %request.url, error = %err, "Skipping JobPosting block");
                }
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourcePlatform;

    fn request() -> CrawlRequest {
        CrawlRequest::detail("https://example.com/job/1", SourcePlatform::Indeed, "1")
    }

    fn page(scripts: &[&str]) -> Html {
        let body: String = scripts
            .iter()
            .map(|s| format!(r#"<script type="application/ld+json">{s}</script>"#))
            .collect();
        Html::parse_document(&format!("<html><head>{body}</head><body></body></html>"))
    }

    #[test]
    fn full_posting_is_extracted() {
        let doc = page(&[r#"{
            "@context": "https://schema.org",
            "@type": "JobPosting",
            "title": "Rust Engineer",
            "hiringOrganization": {"@type": "Organization", "name": "Acme"},
            "jobLocation": {"@type": "Place", "address": {"addressLocality": "Lyon", "addressRegion": "ARA"}},
            "employmentType": ["FULL_TIME", "CONTRACTOR"],
            "baseSalary": {"@type": "MonetaryAmount", "currency": "EUR",
                           "value": {"@type": "QuantitativeValue", "minValue": 45000, "maxValue": 55000}},
            "description": "<p>Build things.</p><p>Profil : Rust</p>",
            "datePosted": "2024-03-15T10:00:00Z",
            "experienceRequirements": {"@type": "OccupationalExperienceRequirements", "monthsOfExperience": 72},
            "educationRequirements": {"@type": "EducationalOccupationalCredential", "credentialCategory": "bachelor degree"},
            "jobLocationType": "TELECOMMUTE"
        }"#]);

        let fields = extract_job_posting(&doc, &request()).unwrap().unwrap();
        assert_eq!(fields.title.as_deref(), Some("Rust Engineer"));
        assert_eq!(fields.company.as_deref(), Some("Acme"));
        assert_eq!(fields.location.as_deref(), Some("Lyon"));
        assert_eq!(fields.contract.as_deref(), Some("FULL_TIME, CONTRACTOR"));
        assert_eq!(fields.salary.as_deref(), Some("45000"));
        assert_eq!(fields.currency.as_deref(), Some("EUR"));
        assert_eq!(
            fields.description.as_deref(),
            Some("Build things.\n\nProfil : Rust")
        );
        assert_eq!(fields.posted_at.as_deref(), Some("2024-03-15T10:00:00Z"));
        assert_eq!(fields.experience.as_deref(), Some("Senior"));
        assert_eq!(fields.education.as_deref(), Some("bachelor degree"));
        assert_eq!(fields.remote.as_deref(), Some("Remote"));
    }

    #[test]
    fn malformed_blocks_are_skipped() {
        let doc = page(&[
            "{ this is not json",
            r#"{"@type": "JobPosting", "title": {"unexpected": true}}"#,
            r#"{"@type": "JobPosting", "title": "Second try", "hiringOrganization": "Acme"}"#,
        ]);
        let fields = extract_job_posting(&doc, &request()).unwrap().unwrap();
        assert_eq!(fields.title.as_deref(), Some("Second try"));
        assert_eq!(fields.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn non_posting_types_are_ignored() {
        let doc = page(&[r#"{"@type": "Organization", "name": "Acme"}"#]);
        assert!(extract_job_posting(&doc, &request()).unwrap().is_none());
    }

    #[test]
    fn graph_and_arrays_are_searched() {
        let doc = page(&[
            r#"{"@context": "https://schema.org", "@graph": [
                {"@type": "WebPage", "name": "Jobs"},
                {"@type": ["JobPosting"], "title": "In graph",
                 "jobLocation": [{"address": {"addressRegion": "Bretagne"}}],
                 "baseSalary": {"currency": "EUR", "value": 38000}}
            ]}"#,
        ]);
        let fields = extract_job_posting(&doc, &request()).unwrap().unwrap();
        assert_eq!(fields.title.as_deref(), Some("In graph"));
        assert_eq!(fields.location.as_deref(), Some("Bretagne"));
        assert_eq!(fields.salary.as_deref(), Some("38000"));
    }

    #[test]
    fn page_without_blocks_yields_nothing() {
        let doc = Html::parse_document("<html><body><h1>Hi</h1></body></html>");
        assert!(extract_job_posting(&doc, &request()).unwrap().is_none());
    }

    #[test]
    fn months_map_to_tiers() {
        assert_eq!(months_to_tier(6.0), ExperienceLevel::Internship);
        assert_eq!(months_to_tier(24.0), ExperienceLevel::Junior);
        assert_eq!(months_to_tier(48.0), ExperienceLevel::Mid);
        assert_eq!(months_to_tier(84.0), ExperienceLevel::Senior);
        assert_eq!(months_to_tier(180.0), ExperienceLevel::Lead);
    }
}
