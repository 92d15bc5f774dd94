//! Indeed France.

use scraper::Html;

use super::{Pagination, SourceProfile};
use crate::error::AppError;
use crate::extract::dom::{FieldSelectors, extract_fields};
use crate::extract::{LinkPattern, structured};
use crate::models::{CrawlRequest, RawJobFields, SourcePlatform};
use crate::normalize::Vocabulary;

const SELECTORS: FieldSelectors = FieldSelectors {
    title: &[
        "h1.jobsearch-JobInfoHeader-title",
        "[data-testid='jobsearch-JobInfoHeader-title']",
        "h1",
    ],
    company: &[
        "[data-testid='inlineHeader-companyName']",
        "[data-company-name='true']",
        ".jobsearch-CompanyInfoContainer a",
    ],
    location: &[
        "[data-testid='inlineHeader-companyLocation']",
        "[data-testid='job-location']",
        "#jobLocationText",
    ],
    contract: &[
        "#salaryInfoAndJobType span.css-k5flys",
        "[data-testid='jobsearch-OtherJobDetailsContainer'] [aria-label='Type de poste'] li",
    ],
    remote: &["[data-testid='jobsearch-JobInfoHeader-remote']"],
    salary: &["#salaryInfoAndJobType span.css-19j1a75", "[data-testid='salaryInfo']"],
    description: &["#jobDescriptionText", ".jobsearch-jobDescriptionText"],
    requirements: &[],
    experience: &[],
    education: &[],
    posted_at: &["[data-testid='myJobsStateDate']", "span.date"],
};

fn job_url(id: &str) -> String {
    format!("https://fr.indeed.com/viewjob?jk={id}")
}

fn dom_fields(document: &Html, _request: &CrawlRequest) -> Result<Option<RawJobFields>, AppError> {
    extract_fields(document, &SELECTORS)
}

pub static PROFILE: SourceProfile = SourceProfile {
    platform: SourcePlatform::Indeed,
    search_base: "https://fr.indeed.com/jobs",
    query_param: "q",
    location_param: "l",
    pagination: Pagination::Offset { param: "start" },
    links: LinkPattern {
        selector: "a[data-jk]",
        attribute: "data-jk",
        id_pattern: r"^([0-9a-fA-F]+)$",
        detail_url: job_url,
    },
    detail_strategies: &[structured::extract_job_posting, dom_fields],
    vocabulary: Vocabulary::EMPTY,
};
