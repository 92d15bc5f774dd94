//! LinkedIn public job search.
//!
//! Listings come from the guest "see more" endpoint, which returns bare
//! `<li>` cards; detail pages are the public `/jobs/view/` pages.

use scraper::Html;

use super::{Pagination, SourceProfile};
use crate::error::AppError;
use crate::extract::dom::{FieldSelectors, extract_fields};
use crate::extract::{LinkPattern, structured};
use crate::models::{CrawlRequest, EducationLevel, ExperienceLevel, RawJobFields, SourcePlatform};
use crate::normalize::Vocabulary;

const SELECTORS: FieldSelectors = FieldSelectors {
    title: &[
        "h1.top-card-layout__title",
        "h1.topcard__title",
        "h1.job-title",
        "h1",
    ],
    company: &[
        "a.topcard__org-name-link",
        ".topcard__flavor a",
        ".job-details-jobs-unified-top-card__company-name a",
    ],
    location: &[
        "span.topcard__flavor--bullet",
        ".job-details-jobs-unified-top-card__bullet",
    ],
    contract: &["ul.description__job-criteria-list li:nth-child(2) span.description__job-criteria-text"],
    remote: &[],
    salary: &["div.salary.compensation__salary", ".compensation__salary"],
    description: &[
        "div.show-more-less-html__markup",
        "div.description__text",
        "#job-details",
    ],
    requirements: &[],
    experience: &["ul.description__job-criteria-list li:nth-child(1) span.description__job-criteria-text"],
    education: &[],
    posted_at: &[
        "span.posted-time-ago__text",
        "span.topcard__flavor--metadata",
    ],
};

fn job_url(id: &str) -> String {
    format!("https://www.linkedin.com/jobs/view/{id}/")
}

fn dom_fields(document: &Html, _request: &CrawlRequest) -> Result<Option<RawJobFields>, AppError> {
    extract_fields(document, &SELECTORS)
}

pub static PROFILE: SourceProfile = SourceProfile {
    platform: SourcePlatform::LinkedIn,
    search_base: "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search",
    query_param: "keywords",
    location_param: "location",
    pagination: Pagination::Offset { param: "start" },
    links: LinkPattern {
        selector: "a.base-card__full-link, a[href*='/jobs/view/']",
        attribute: "href",
        id_pattern: r"/jobs/view/(?:[^/?#]*-)?(\d+)",
        detail_url: job_url,
    },
    detail_strategies: &[structured::extract_job_posting, dom_fields],
    vocabulary: Vocabulary {
        experience_codes: &[
            ("Internship", ExperienceLevel::Internship),
            ("Stage", ExperienceLevel::Internship),
            ("Entry level", ExperienceLevel::Junior),
            ("Premier emploi", ExperienceLevel::Junior),
            ("Associate", ExperienceLevel::Junior),
            ("Mid-Senior level", ExperienceLevel::Mid),
            ("Confirmé", ExperienceLevel::Mid),
            ("Director", ExperienceLevel::Lead),
            ("Directeur", ExperienceLevel::Lead),
            ("Executive", ExperienceLevel::Lead),
            ("Cadre dirigeant", ExperienceLevel::Lead),
        ],
        education_codes: &[
            ("Bachelor's Degree", EducationLevel::Bachelor),
            ("Master's Degree", EducationLevel::Master),
            ("Doctor of Philosophy", EducationLevel::Doctorate),
        ],
    },
};
