//! Search criteria: what one pipeline run is filtered against.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::CriteriaError;
use crate::types::source::{Source, WorkType};

/// Maximum posting age, in the boards' `r<seconds>` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeWindow {
    seconds: u64,
}

impl TimeWindow {
    /// First-applicant mode.
    pub const FIVE_MINUTES: TimeWindow = TimeWindow { seconds: 300 };
    /// Ultra-recent mode.
    pub const TEN_MINUTES: TimeWindow = TimeWindow { seconds: 600 };
    pub const ONE_HOUR: TimeWindow = TimeWindow { seconds: 3_600 };
    pub const ONE_DAY: TimeWindow = TimeWindow { seconds: 86_400 };

    /// Longest window accepted from callers: 30 days.
    pub const MAX_SECONDS: u64 = 30 * 86_400;

    /// Named windows offered to users, shortest first.
    pub const NAMED: [(&'static str, u64); 8] = [
        ("last_5_minutes", 300),
        ("last_10_minutes", 600),
        ("last_15_minutes", 900),
        ("last_30_minutes", 1_800),
        ("last_1_hour", 3_600),
        ("last_2_hours", 7_200),
        ("last_6_hours", 21_600),
        ("last_24_hours", 86_400),
    ];

    pub fn from_seconds(seconds: u64) -> Result<Self, CriteriaError> {
        if seconds == 0 {
            return Err(CriteriaError::NonPositiveMaxAge);
        }
        if seconds > Self::MAX_SECONDS {
            return Err(CriteriaError::MaxAgeTooLong(seconds));
        }
        Ok(Self { seconds })
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn duration(&self) -> Duration {
        i64::try_from(self.seconds.min(Self::MAX_SECONDS))
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Board code, e.g. `r3600`.
    pub fn code(&self) -> String {
        format!("r{}", self.seconds)
    }
}

impl FromStr for TimeWindow {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if let Some((_, seconds)) = Self::NAMED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(code))
        {
            return Ok(Self { seconds: *seconds });
        }

        let invalid = || CriteriaError::InvalidTimeWindow(s.to_string());
        let digits = code
            .strip_prefix('r')
            .or_else(|| code.strip_prefix('R'))
            .ok_or_else(invalid)?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let seconds: u64 = digits.parse().map_err(|_| invalid())?;
        if seconds == 0 || seconds > Self::MAX_SECONDS {
            return Err(invalid());
        }
        Ok(Self { seconds })
    }
}

impl TryFrom<String> for TimeWindow {
    type Error = CriteriaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeWindow> for String {
    fn from(window: TimeWindow) -> Self {
        window.code()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.seconds)
    }
}

/// Title terms that mark a posting as a likely scam.
pub const DEFAULT_BLOCKED_TITLE_TERMS: [&str; 4] = ["scam", "fake", "pyramid", "mlm"];

/// One keyword entry.
///
/// Grammar: an entry is an AND of its parts. A part is either a bare word
/// or a `"quoted phrase"`; an entry wrapped entirely in quotes is therefore
/// a single exact phrase. Entries in a list are OR'd by the filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeywordTerm {
    raw: String,
    needles: Vec<String>,
}

impl KeywordTerm {
    pub fn parse(entry: &str) -> Result<Self, CriteriaError> {
        let raw = entry.trim();
        if raw.matches('"').count() % 2 != 0 {
            return Err(CriteriaError::UnbalancedQuote(raw.to_string()));
        }

        let mut needles = Vec::new();
        for (i, segment) in raw.split('"').enumerate() {
            let quoted = i % 2 == 1;
            if quoted {
                let phrase = segment.split_whitespace().collect::<Vec<_>>().join(" ");
                if !phrase.is_empty() {
                    needles.push(phrase.to_lowercase());
                }
            } else {
                needles.extend(segment.split_whitespace().map(|w| w.to_lowercase()));
            }
        }

        if needles.is_empty() {
            return Err(CriteriaError::BlankKeyword);
        }

        Ok(Self {
            raw: raw.to_string(),
            needles,
        })
    }

    /// True when every part occurs in `haystack_lower` (already lowercased).
    pub fn matches(&self, haystack_lower: &str) -> bool {
        self.needles.iter().all(|n| haystack_lower.contains(n.as_str()))
    }

    /// Matches against arbitrary-case text.
    pub fn matches_text(&self, text: &str) -> bool {
        self.matches(&text.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn needles(&self) -> &[String] {
        &self.needles
    }
}

impl TryFrom<String> for KeywordTerm {
    type Error = CriteriaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeywordTerm> for String {
    fn from(term: KeywordTerm) -> Self {
        term.raw
    }
}

impl fmt::Display for KeywordTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Input to one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// OR'd across entries; empty means no keyword constraint
    pub keywords: IndexSet<KeywordTerm>,

    /// Any match rejects the job, regardless of `keywords`
    pub exclude_keywords: IndexSet<KeywordTerm>,

    /// Accepted locations; empty means anywhere
    pub locations: IndexSet<String>,

    pub min_salary: Option<u64>,
    pub max_salary: Option<u64>,

    pub max_age: TimeWindow,

    /// Upper bound on records requested from each source
    pub per_source_cap: usize,

    pub sources: IndexSet<Source>,

    /// Jobs scoring below this are dropped after scoring
    pub min_quality_score: Option<u8>,

    pub work_type: Option<WorkType>,

    /// Jobs whose title matches any of these are dropped as suspicious.
    /// Empty disables the check.
    pub blocked_title_terms: IndexSet<KeywordTerm>,
}

impl SearchCriteria {
    /// Criteria over LinkedIn with the given window and no other constraints.
    pub fn new(max_age: TimeWindow) -> Self {
        Self {
            keywords: IndexSet::new(),
            exclude_keywords: IndexSet::new(),
            locations: IndexSet::new(),
            min_salary: None,
            max_salary: None,
            max_age,
            per_source_cap: 25,
            sources: IndexSet::from([Source::LinkedIn]),
            min_quality_score: None,
            work_type: None,
            blocked_title_terms: DEFAULT_BLOCKED_TITLE_TERMS
                .iter()
                .filter_map(|term| KeywordTerm::parse(term).ok())
                .collect(),
        }
    }

    /// Add keyword entries.
    pub fn with_keywords<I, S>(mut self, entries: I) -> Result<Self, CriteriaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            self.keywords.insert(KeywordTerm::parse(entry.as_ref())?);
        }
        Ok(self)
    }

    /// Add exclude-keyword entries.
    pub fn with_exclude_keywords<I, S>(mut self, entries: I) -> Result<Self, CriteriaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            self.exclude_keywords.insert(KeywordTerm::parse(entry.as_ref())?);
        }
        Ok(self)
    }

    /// Replace the suspicious-title terms. An empty list disables the check.
    pub fn with_blocked_title_terms<I, S>(mut self, entries: I) -> Result<Self, CriteriaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blocked_title_terms.clear();
        for entry in entries {
            self.blocked_title_terms.insert(KeywordTerm::parse(entry.as_ref())?);
        }
        Ok(self)
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations
            .extend(locations.into_iter().map(Into::into).filter(|l: &String| !l.trim().is_empty()));
        self
    }

    pub fn with_salary_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_salary = min;
        self.max_salary = max;
        self
    }

    pub fn with_per_source_cap(mut self, cap: usize) -> Self {
        self.per_source_cap = cap;
        self
    }

    /// Replace the requested sources.
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    pub fn with_min_quality_score(mut self, score: u8) -> Self {
        self.min_quality_score = Some(score);
        self
    }

    pub fn with_work_type(mut self, work_type: WorkType) -> Self {
        self.work_type = Some(work_type);
        self
    }

    /// Cross-field checks. Runs before any fetch.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        if let (Some(min), Some(max)) = (self.min_salary, self.max_salary) {
            if min > max {
                return Err(CriteriaError::SalaryRange { min, max });
            }
        }
        if self.max_age.seconds() == 0 {
            return Err(CriteriaError::NonPositiveMaxAge);
        }
        if self.max_age.seconds() > TimeWindow::MAX_SECONDS {
            return Err(CriteriaError::MaxAgeTooLong(self.max_age.seconds()));
        }
        if self.per_source_cap == 0 {
            return Err(CriteriaError::ZeroResultCap);
        }
        if self.sources.is_empty() {
            return Err(CriteriaError::NoSources);
        }
        if let Some(score) = self.min_quality_score {
            if score > 100 {
                return Err(CriteriaError::QualityOutOfRange(score));
            }
        }
        Ok(())
    }
}

/// Raw search parameters as a CLI or API caller supplies them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    /// Board time-window code, e.g. `r3600`
    pub time_window: String,
    pub result_cap: usize,
    #[serde(default)]
    pub sources: Vec<String>,
    pub min_salary: Option<u64>,
    pub max_salary: Option<u64>,
    pub min_quality_score: Option<u8>,
    pub work_type: Option<String>,
    /// Replaces the default suspicious-title terms when set
    #[serde(default)]
    pub blocked_title_terms: Option<Vec<String>>,
}

impl SearchRequest {
    /// Parse and validate into criteria.
    pub fn into_criteria(self) -> Result<SearchCriteria, CriteriaError> {
        let window: TimeWindow = self.time_window.parse()?;

        let mut criteria = SearchCriteria::new(window)
            .with_keywords(&self.keywords)?
            .with_exclude_keywords(&self.exclude_keywords)?
            .with_locations(self.locations)
            .with_salary_range(self.min_salary, self.max_salary)
            .with_per_source_cap(self.result_cap);

        if !self.sources.is_empty() {
            let sources = self
                .sources
                .iter()
                .map(|s| s.parse::<Source>())
                .collect::<Result<Vec<_>, _>>()?;
            criteria = criteria.with_sources(sources);
        }
        if let Some(score) = self.min_quality_score {
            criteria = criteria.with_min_quality_score(score);
        }
        if let Some(work_type) = self.work_type {
            criteria = criteria.with_work_type(work_type.parse()?);
        }
        if let Some(terms) = self.blocked_title_terms {
            criteria = criteria.with_blocked_title_terms(terms)?;
        }

        criteria.validate()?;
        Ok(criteria)
    }
}
