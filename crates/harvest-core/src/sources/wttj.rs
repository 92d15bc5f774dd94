//! Welcome to the Jungle.
//!
//! Job pages embed a JSON-LD `JobPosting`; the metadata block below the
//! title is keyed by icon alt text, which the DOM fallback relies on.

use scraper::Html;

use super::{Pagination, SourceProfile};
use crate::error::AppError;
use crate::extract::dom::{FieldSelectors, extract_fields};
use crate::extract::{LinkPattern, structured};
use crate::models::{CrawlRequest, EducationLevel, ExperienceLevel, RawJobFields, SourcePlatform};
use crate::normalize::Vocabulary;

/// Results per listing page.
pub const PAGE_SIZE: usize = 30;

const SELECTORS: FieldSelectors = FieldSelectors {
    title: &["[data-testid='job-metadata-block'] h2", "main h1", "h1"],
    company: &[
        "[data-testid='job-metadata-block'] a span",
        "[data-testid='job-metadata-block'] a",
    ],
    location: &["svg[alt='Location'] ~ span", "i[name='location'] ~ span"],
    contract: &["svg[alt='Contract'] ~ span", "i[name='contract'] ~ span"],
    remote: &["svg[alt='Remote'] ~ span", "i[name='remote'] ~ span"],
    salary: &["svg[alt='Salary'] ~ span", "i[name='salary'] ~ span"],
    description: &["div[data-testid='job-section-description']"],
    requirements: &["div[data-testid='job-section-experience']"],
    experience: &["svg[alt='Suitcase'] ~ span", "i[name='suitcase'] ~ span"],
    education: &[
        "svg[alt='EducationLevel'] ~ span",
        "i[name='education_level'] ~ span",
    ],
    posted_at: &["time@datetime"],
};

fn job_url(id: &str) -> String {
    format!("https://www.welcometothejungle.com/fr/companies/{id}")
}

fn dom_fields(document: &Html, _request: &CrawlRequest) -> Result<Option<RawJobFields>, AppError> {
    extract_fields(document, &SELECTORS)
}

pub static PROFILE: SourceProfile = SourceProfile {
    platform: SourcePlatform::WelcomeToTheJungle,
    search_base: "https://www.welcometothejungle.com/fr/jobs",
    query_param: "query",
    location_param: "aroundQuery",
    pagination: Pagination::Page {
        param: "page",
        per_page: PAGE_SIZE,
    },
    links: LinkPattern {
        selector: "a[href*='/jobs/']",
        attribute: "href",
        id_pattern: r"/companies/([^/?#]+/jobs/[^/?#]+)",
        detail_url: job_url,
    },
    detail_strategies: &[structured::extract_job_posting, dom_fields],
    vocabulary: Vocabulary {
        experience_codes: &[
            ("LESS_THAN_6_MONTHS", ExperienceLevel::Internship),
            ("6_MONTHS_TO_1_YEAR", ExperienceLevel::Internship),
            ("1_TO_2_YEARS", ExperienceLevel::Junior),
            ("2_TO_3_YEARS", ExperienceLevel::Junior),
            ("3_TO_4_YEARS", ExperienceLevel::Mid),
            ("4_TO_5_YEARS", ExperienceLevel::Mid),
            ("5_TO_7_YEARS", ExperienceLevel::Senior),
            ("7_TO_10_YEARS", ExperienceLevel::Senior),
            ("MORE_THAN_10_YEARS", ExperienceLevel::Lead),
        ],
        education_codes: &[
            ("BAC", EducationLevel::Associate),
            ("BAC_2", EducationLevel::Associate),
            ("BAC_3", EducationLevel::Bachelor),
            ("BAC_4", EducationLevel::Bachelor),
            ("BAC_5", EducationLevel::Master),
            ("PHD", EducationLevel::Doctorate),
        ],
    },
};
