//! Cross-source canonicalization of raw job fields.
//!
//! Normalization is total: every input resolves to a canonical value or
//! `None`, never an error.

pub mod date;
pub mod derive;
pub mod salary;

use chrono::Utc;

pub use date::normalize_date;
pub use derive::{education_from_text, experience_from_text, requirements_snippet};
pub use salary::{infer_currency, parse_salary};

use crate::models::{EducationLevel, ExperienceLevel, NormalizedJob, RawJobFields, SourcePlatform};
use crate::util::{collapse_whitespace, non_empty};

/// Values meaning "the site did not say".
const NOT_SPECIFIED: &[&str] = &[
    "not specified",
    "non spécifié",
    "non specifie",
    "non spécifiée",
    "non précisé",
    "n/a",
    "not applicable",
    "none",
    "-",
];

/// Schema.org `credentialCategory` values shared by all sources.
const CREDENTIAL_CATEGORIES: &[(&str, EducationLevel)] = &[
    ("associate degree", EducationLevel::Associate),
    ("bachelor degree", EducationLevel::Bachelor),
    ("postgraduate degree", EducationLevel::Master),
    ("doctoral degree", EducationLevel::Doctorate),
];

/// A source's native enumerated codes for experience and education.
#[derive(Debug, Clone, Copy)]
pub struct Vocabulary {
    pub experience_codes: &'static [(&'static str, ExperienceLevel)],
    pub education_codes: &'static [(&'static str, EducationLevel)],
}

impl Vocabulary {
    pub const EMPTY: Vocabulary = Vocabulary {
        experience_codes: &[],
        education_codes: &[],
    };
}

fn is_not_specified(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower.is_empty() || NOT_SPECIFIED.contains(&lower.as_str())
}

fn lookup<T: Copy>(table: &[(&str, T)], value: &str) -> Option<T> {
    let lower = value.trim().to_lowercase();
    table
        .iter()
        .find(|(code, _)| code.to_lowercase() == lower)
        .map(|(_, tier)| *tier)
}

/// Map a native experience value to a canonical tier.
///
/// Order: sentinel → source code table → canonical name → keyword rules.
pub fn normalize_experience(raw: &str, vocab: &Vocabulary) -> Option<ExperienceLevel> {
    if is_not_specified(raw) {
        return None;
    }
    lookup(vocab.experience_codes, raw)
        .or_else(|| raw.parse().ok())
        .or_else(|| experience_from_text(raw))
}

/// Map a native education value to a canonical tier.
pub fn normalize_education(raw: &str, vocab: &Vocabulary) -> Option<EducationLevel> {
    if is_not_specified(raw) {
        return None;
    }
    lookup(vocab.education_codes, raw)
        .or_else(|| lookup(CREDENTIAL_CATEGORIES, raw))
        .or_else(|| raw.parse().ok())
        .or_else(|| education_from_text(raw))
}

/// Build the canonical record from one strategy's raw fields.
///
/// Returns `None` when the title is missing or blank. Experience,
/// education and requirements fall back to the description when the
/// page has no native value for them.
pub fn normalize_job(
    fields: RawJobFields,
    platform: SourcePlatform,
    vocab: &Vocabulary,
    page_url: &str,
) -> Option<NormalizedJob> {
    let title = collapse_whitespace(fields.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }

    let description = non_empty(fields.description);

    let experience_level = match non_empty(fields.experience) {
        Some(raw) => normalize_experience(&raw, vocab),
        None => description.as_deref().and_then(experience_from_text),
    };
    let education_level = match non_empty(fields.education) {
        Some(raw) => normalize_education(&raw, vocab),
        None => description.as_deref().and_then(education_from_text),
    };
    let requirements = non_empty(fields.requirements)
        .or_else(|| description.as_deref().and_then(requirements_snippet));

    let salary_raw = non_empty(fields.salary);
    let salary = salary_raw.as_deref().and_then(parse_salary);
    let currency = non_empty(fields.currency)
        .map(|c| c.to_uppercase())
        .or_else(|| salary_raw.as_deref().and_then(infer_currency));

    Some(NormalizedJob {
        source_platform: platform,
        title,
        company: non_empty(fields.company).map(|c| collapse_whitespace(&c)),
        location: non_empty(fields.location).map(|l| collapse_whitespace(&l)),
        contract: non_empty(fields.contract).map(|c| collapse_whitespace(&c)),
        remote: non_empty(fields.remote).map(|r| collapse_whitespace(&r)),
        salary,
        currency,
        description,
        requirements,
        experience_level,
        education_level,
        published_at: fields.posted_at.as_deref().and_then(normalize_date),
        url: non_empty(fields.url).unwrap_or_else(|| page_url.to_string()),
        detected_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODES: Vocabulary = Vocabulary {
        experience_codes: &[
            ("5_TO_7_YEARS", ExperienceLevel::Senior),
            ("LESS_THAN_6_MONTHS", ExperienceLevel::Internship),
        ],
        education_codes: &[("BAC_5", EducationLevel::Master)],
    };

    #[test]
    fn enumerated_code_maps_directly() {
        assert_eq!(
            normalize_experience("5_TO_7_YEARS", &CODES),
            Some(ExperienceLevel::Senior)
        );
        assert_eq!(
            normalize_experience("5_to_7_years", &CODES),
            Some(ExperienceLevel::Senior)
        );
        assert_eq!(
            normalize_education("bac_5", &CODES),
            Some(EducationLevel::Master)
        );
    }

    #[test]
    fn free_text_uses_keyword_rules() {
        assert_eq!(
            normalize_experience("stage de 6 mois", &CODES),
            Some(ExperienceLevel::Internship)
        );
    }

    #[test]
    fn sentinels_are_null() {
        assert_eq!(normalize_experience("Non spécifié", &CODES), None);
        assert_eq!(normalize_experience("NOT SPECIFIED", &CODES), None);
        assert_eq!(normalize_education("", &CODES), None);
    }

    #[test]
    fn canonical_names_pass_through() {
        assert_eq!(
            normalize_experience("lead", &Vocabulary::EMPTY),
            Some(ExperienceLevel::Lead)
        );
        assert_eq!(
            normalize_education("DOCTORATE", &Vocabulary::EMPTY),
            Some(EducationLevel::Doctorate)
        );
    }

    #[test]
    fn credential_categories_are_shared() {
        assert_eq!(
            normalize_education("bachelor degree", &Vocabulary::EMPTY),
            Some(EducationLevel::Bachelor)
        );
    }

    #[test]
    fn unmatched_is_null() {
        assert_eq!(normalize_experience("whatever", &CODES), None);
        assert_eq!(normalize_education("whatever", &CODES), None);
    }

    #[test]
    fn blank_title_drops_record() {
        let fields = RawJobFields {
            title: Some("  \n ".into()),
            company: Some("Acme".into()),
            ..Default::default()
        };
        assert!(normalize_job(fields, SourcePlatform::Indeed, &CODES, "https://x").is_none());
    }

    #[test]
    fn record_is_canonicalized() {
        let fields = RawJobFields {
            title: Some("  Backend\n Engineer ".into()),
            company: Some("Acme".into()),
            salary: Some("45K€".into()),
            description: Some("Poste senior.\n\nProfil :\nRust et SQL".into()),
            experience: Some("Non spécifié".into()),
            posted_at: Some("2024-03-15T10:00:00Z".into()),
            ..Default::default()
        };
        let job = normalize_job(
            fields,
            SourcePlatform::WelcomeToTheJungle,
            &CODES,
            "https://example.com/job/1",
        )
        .unwrap();

        assert_eq!(job.title, "Backend Engineer");
        assert_eq!(job.salary, Some(45000));
        assert_eq!(job.currency.as_deref(), Some("EUR"));
        // An explicit sentinel is not overridden by the description.
        assert_eq!(job.experience_level, None);
        assert_eq!(job.requirements.as_deref(), Some("Rust et SQL"));
        assert_eq!(job.published_at.as_deref(), Some("2024-03-15"));
        assert_eq!(job.url, "https://example.com/job/1");
    }

    #[test]
    fn missing_native_fields_are_derived_from_description() {
        let fields = RawJobFields {
            title: Some("Data Analyst".into()),
            description: Some("Stage de 6 mois, niveau Bac+5 requis.".into()),
            ..Default::default()
        };
        let job = normalize_job(fields, SourcePlatform::Indeed, &Vocabulary::EMPTY, "u").unwrap();
        assert_eq!(job.experience_level, Some(ExperienceLevel::Internship));
        assert_eq!(job.education_level, Some(EducationLevel::Master));
    }
}
