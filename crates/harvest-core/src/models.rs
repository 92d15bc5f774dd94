use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `user_data` key holding the listing root a request descends from.
pub const ROOT_KEY: &str = "root";
/// `user_data` key holding the pagination offset of a listing page.
pub const OFFSET_KEY: &str = "offset";
/// `user_data` key holding the per-root result cap.
pub const MAX_RESULTS_KEY: &str = "max_results";
/// `user_data` key counting block re-enqueues of this URL.
pub const BLOCK_RETRIES_KEY: &str = "block_retries";
/// `user_data` key holding the job identifier of a detail page.
pub const JOB_ID_KEY: &str = "job_id";

/// The listing site a request or record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourcePlatform {
    /// Professional network (LinkedIn guest job search).
    #[serde(rename = "Linkedin")]
    LinkedIn,
    /// General job board (Indeed).
    #[serde(rename = "Indeed")]
    Indeed,
    /// Tech-focused board (Welcome to the Jungle).
    #[serde(rename = "Welcome to the jungle")]
    WelcomeToTheJungle,
}

impl SourcePlatform {
    pub const ALL: [SourcePlatform; 3] = [
        SourcePlatform::LinkedIn,
        SourcePlatform::Indeed,
        SourcePlatform::WelcomeToTheJungle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourcePlatform::LinkedIn => "Linkedin",
            SourcePlatform::Indeed => "Indeed",
            SourcePlatform::WelcomeToTheJungle => "Welcome to the jungle",
        }
    }

    /// Short command-line name.
    pub fn slug(&self) -> &'static str {
        match self {
            SourcePlatform::LinkedIn => "linkedin",
            SourcePlatform::Indeed => "indeed",
            SourcePlatform::WelcomeToTheJungle => "wttj",
        }
    }
}

impl fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourcePlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Ok(SourcePlatform::LinkedIn),
            "indeed" => Ok(SourcePlatform::Indeed),
            "wttj" | "welcometothejungle" | "welcome to the jungle" => {
                Ok(SourcePlatform::WelcomeToTheJungle)
            }
            _ => Err(format!("Unknown source: {}", s)),
        }
    }
}

/// Kind of page a request points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestLabel {
    Listing,
    Detail,
}

impl RequestLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestLabel::Listing => "listing",
            RequestLabel::Detail => "detail",
        }
    }
}

impl fmt::Display for RequestLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work in the frontier.
///
/// Built once and never mutated after it is enqueued; derived requests
/// (next page, block retry) are new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    pub label: RequestLabel,
    pub source: SourcePlatform,
    pub user_data: Map<String, Value>,
    pub headers: BTreeMap<String, String>,
    /// Process even if the URL was already visited in this run.
    pub force: bool,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>, label: RequestLabel, source: SourcePlatform) -> Self {
        Self {
            url: url.into(),
            label,
            source,
            user_data: Map::new(),
            headers: BTreeMap::new(),
            force: false,
        }
    }

    /// A seed listing request; the URL is its own pagination root.
    pub fn listing(url: impl Into<String>, source: SourcePlatform, max_results: usize) -> Self {
        let url = url.into();
        Self::new(url.clone(), RequestLabel::Listing, source)
            .with_user_data(ROOT_KEY, Value::String(url))
            .with_user_data(OFFSET_KEY, Value::from(0u64))
            .with_user_data(MAX_RESULTS_KEY, Value::from(max_results as u64))
    }

    pub fn detail(url: impl Into<String>, source: SourcePlatform, job_id: &str) -> Self {
        Self::new(url, RequestLabel::Detail, source)
            .with_user_data(JOB_ID_KEY, Value::String(job_id.to_string()))
    }

    pub fn with_user_data(mut self, key: &str, value: Value) -> Self {
        self.user_data.insert(key.to_string(), value);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Copy headers from `other` without overriding ones already set here.
    pub fn inherit_headers(mut self, other: &BTreeMap<String, String>) -> Self {
        for (name, value) in other {
            self.headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Listing root this request descends from (its own URL for seeds).
    pub fn root(&self) -> &str {
        self.user_data
            .get(ROOT_KEY)
            .and_then(Value::as_str)
            .unwrap_or(&self.url)
    }

    pub fn offset(&self) -> usize {
        self.usize_field(OFFSET_KEY).unwrap_or(0)
    }

    pub fn max_results(&self) -> Option<usize> {
        self.usize_field(MAX_RESULTS_KEY)
    }

    pub fn block_retries(&self) -> u32 {
        self.usize_field(BLOCK_RETRIES_KEY).unwrap_or(0) as u32
    }

    pub fn job_id(&self) -> Option<&str> {
        self.user_data.get(JOB_ID_KEY).and_then(Value::as_str)
    }

    fn usize_field(&self, key: &str) -> Option<usize> {
        self.user_data
            .get(key)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
    }
}

/// A fetched page, handed to exactly one router invocation.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub request: CrawlRequest,
    pub status_code: u16,
    /// Raw HTML (or rendered DOM serialized back to HTML).
    pub content: String,
    pub fetched_at: DateTime<Utc>,
}

impl PageResult {
    pub fn new(request: CrawlRequest, status_code: u16, content: impl Into<String>) -> Self {
        Self {
            request,
            status_code,
            content: content.into(),
            fetched_at: Utc::now(),
        }
    }
}

/// Strings pulled from one detail page by one extraction strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawJobFields {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub contract: Option<String>,
    pub remote: Option<String>,
    pub salary: Option<String>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub posted_at: Option<String>,
    pub url: Option<String>,
}

impl RawJobFields {
    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Canonical experience tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Internship,
    Junior,
    Mid,
    Senior,
    Lead,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 5] = [
        ExperienceLevel::Internship,
        ExperienceLevel::Junior,
        ExperienceLevel::Mid,
        ExperienceLevel::Senior,
        ExperienceLevel::Lead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Internship => "Internship",
            ExperienceLevel::Junior => "Junior",
            ExperienceLevel::Mid => "Mid",
            ExperienceLevel::Senior => "Senior",
            ExperienceLevel::Lead => "Lead",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown experience level: {}", s))
    }
}

/// Canonical education tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationLevel {
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 4] = [
        EducationLevel::Associate,
        EducationLevel::Bachelor,
        EducationLevel::Master,
        EducationLevel::Doctorate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EducationLevel::Associate => "Associate",
            EducationLevel::Bachelor => "Bachelor",
            EducationLevel::Master => "Master",
            EducationLevel::Doctorate => "Doctorate",
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EducationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown education level: {}", s))
    }
}

/// The canonical job record handed to a [`Sink`](crate::traits::Sink).
///
/// Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedJob {
    pub source_platform: SourcePlatform,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub contract: Option<String>,
    pub remote: Option<String>,
    pub salary: Option<i64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub education_level: Option<EducationLevel>,
    /// Calendar date (`YYYY-MM-DD`) when parseable, else the raw text.
    pub published_at: Option<String>,
    pub url: String,
    pub detected_at: DateTime<Utc>,
}

/// A request abandoned for good, kept for the run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlFailure {
    pub url: String,
    pub label: RequestLabel,
    pub reason: String,
}
