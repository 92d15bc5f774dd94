//! Fields derived from free-text job descriptions.
//!
//! Rules are ordered; the first matching rule decides the tier.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{EducationLevel, ExperienceLevel};
use crate::util::truncate_chars;

const REQUIREMENTS_MAX_CHARS: usize = 600;
const REQUIREMENT_LINE_MAX_CHARS: usize = 200;
const REQUIREMENT_LINES_MAX: usize = 6;
const REQUIREMENT_KEYWORDS: &[&str] = &["respons", "requ", "compétence", "competenc", "skill"];

static EXPERIENCE_RULES: LazyLock<Vec<(Regex, ExperienceLevel)>> = LazyLock::new(|| {
    [
        (
            r"\b(stage|stagiaire|internship|intern)\b",
            ExperienceLevel::Internship,
        ),
        (
            r"\b(apprenti|apprentie|apprentissage|alternance|alternant|apprenticeship)\b",
            ExperienceLevel::Internship,
        ),
        (
            r"\b(junior|débutant|entry[- ]level|0\s*[-–à]\s*2\s*(ans|years?))\b",
            ExperienceLevel::Junior,
        ),
        (
            r"\b(3\s*[-–à]\s*5\s*(ans|years?)|mid[- ]level|confirmé)\b",
            ExperienceLevel::Mid,
        ),
        (
            r"\b(6\s*\+\s*(ans|years?)|senior|lead)\b",
            ExperienceLevel::Senior,
        ),
    ]
    .into_iter()
    .map(|(pattern, level)| (Regex::new(pattern).unwrap(), level))
    .collect()
});

static EDUCATION_RULES: LazyLock<Vec<(Regex, EducationLevel)>> = LazyLock::new(|| {
    [
        (
            r"bac\s*\+\s*5|\bmaster|\bmsc\b|ma[iî]trise",
            EducationLevel::Master,
        ),
        (
            r"bac\s*\+\s*[34]|\blicence\b|\bbachelor",
            EducationLevel::Bachelor,
        ),
        (r"bac\s*\+\s*2|\bassociate\b", EducationLevel::Associate),
        (r"doctorat|doctorate|\bph\.?\s?d\b", EducationLevel::Doctorate),
    ]
    .into_iter()
    .map(|(pattern, level)| (Regex::new(pattern).unwrap(), level))
    .collect()
});

static REQUIREMENT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)(?:^|\n)[ \t#*•-]*(?:profil|responsabilit[eé]s|responsibilities|missions|requirements|qualifications)[^\n:]{0,40}:?[ \t]*\n*(?P<body>.*?)(?:\n{2,}|$)",
    )
    .unwrap()
});

/// Experience tier mentioned in free text, if any.
pub fn experience_from_text(text: &str) -> Option<ExperienceLevel> {
    let lower = text.to_lowercase();
    EXPERIENCE_RULES
        .iter()
        .find(|(re, _)| re.is_match(&lower))
        .map(|(_, level)| *level)
}

/// Education tier mentioned in free text, if any.
pub fn education_from_text(text: &str) -> Option<EducationLevel> {
    let lower = text.to_lowercase();
    EDUCATION_RULES
        .iter()
        .find(|(re, _)| re.is_match(&lower))
        .map(|(_, level)| *level)
}

/// Requirements excerpt from a description.
///
/// Prefers the body of a labeled section (blank lines after the heading
/// are skipped, then up to the next blank line, capped at 600 characters); otherwise joins up to six short lines that
/// mention requirements or skills.
pub fn requirements_snippet(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    let section = REQUIREMENT_SECTION
        .captures_iter(text)
        .filter_map(|caps| caps.name("body"))
        .map(|body| body.as_str().trim())
        .find(|body| !body.is_empty());
    if let Some(body) = section {
        return Some(truncate_chars(body, REQUIREMENTS_MAX_CHARS));
    }

    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.trim_matches(|c: char| c == '-' || c == '•' || c.is_whitespace()))
        .filter(|line| !line.is_empty())
        .filter(|line| line.chars().count() < REQUIREMENT_LINE_MAX_CHARS)
        .filter(|line| {
            let lower = line.to_lowercase();
            REQUIREMENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .take(REQUIREMENT_LINES_MAX)
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("; "))
    }
}
