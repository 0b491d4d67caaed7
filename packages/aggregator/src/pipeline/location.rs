//! Location matching with alias normalization.
//!
//! Locations are compared as sets of canonical region tokens. Province
//! codes expand to names ("ON" -> "ontario"), major cities imply their
//! province, and provinces imply the country. Remote indicators are
//! tracked separately from regions so "Remote" matches any remote job
//! regardless of city.

use std::collections::HashSet;

const REMOTE_INDICATORS: &[&str] = &[
    "remote",
    "anywhere",
    "work from home",
    "wfh",
    "telecommute",
    "distributed",
];

const FILLER_WORDS: &[&str] = &["in", "within", "only", "wide"];

const REGION_ALIASES: &[(&str, &str)] = &[
    ("on", "ontario"),
    ("qc", "quebec"),
    ("québec", "quebec"),
    ("bc", "british columbia"),
    ("ab", "alberta"),
    ("ns", "nova scotia"),
    ("nb", "new brunswick"),
    ("mb", "manitoba"),
    ("sk", "saskatchewan"),
    ("pe", "prince edward island"),
    ("pei", "prince edward island"),
    ("nl", "newfoundland and labrador"),
    ("newfoundland", "newfoundland and labrador"),
    ("montréal", "montreal"),
    ("usa", "united states"),
    ("us", "united states"),
    ("u.s.", "united states"),
    ("united states of america", "united states"),
    ("uk", "united kingdom"),
];

const CITY_PROVINCES: &[(&str, &str)] = &[
    ("toronto", "ontario"),
    ("ottawa", "ontario"),
    ("mississauga", "ontario"),
    ("hamilton", "ontario"),
    ("kitchener", "ontario"),
    ("waterloo", "ontario"),
    ("london", "ontario"),
    ("montreal", "quebec"),
    ("quebec city", "quebec"),
    ("laval", "quebec"),
    ("gatineau", "quebec"),
    ("vancouver", "british columbia"),
    ("surrey", "british columbia"),
    ("burnaby", "british columbia"),
    ("victoria", "british columbia"),
    ("calgary", "alberta"),
    ("edmonton", "alberta"),
    ("halifax", "nova scotia"),
    ("winnipeg", "manitoba"),
    ("regina", "saskatchewan"),
    ("saskatoon", "saskatchewan"),
    ("fredericton", "new brunswick"),
    ("moncton", "new brunswick"),
];

const CANADIAN_PROVINCES: &[&str] = &[
    "ontario",
    "quebec",
    "british columbia",
    "alberta",
    "nova scotia",
    "new brunswick",
    "manitoba",
    "saskatchewan",
    "prince edward island",
    "newfoundland and labrador",
];

/// A location string reduced to remote-ness plus region tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationProfile {
    pub remote: bool,
    /// Tokens as written (after alias canonicalization)
    pub explicit: HashSet<String>,
    /// `explicit` plus implied province/country tokens
    pub expanded: HashSet<String>,
    lowered: String,
}

impl LocationProfile {
    pub fn parse(location: &str) -> Self {
        let lowered = location.trim().to_lowercase();
        let mut remote = false;
        let mut explicit = HashSet::new();

        let separated: String = lowered
            .chars()
            .map(|c| match c {
                ',' | '(' | ')' | '/' | '|' | ';' | '·' | '-' | '–' => ',',
                other => other,
            })
            .collect();

        for component in separated.split(',') {
            let mut component = component.split_whitespace().collect::<Vec<_>>().join(" ");
            for indicator in REMOTE_INDICATORS {
                if component.contains(indicator) {
                    remote = true;
                    component = component.replace(indicator, " ");
                }
            }
            let words: Vec<&str> = component
                .split_whitespace()
                .filter(|w| !FILLER_WORDS.contains(w))
                .collect();
            if words.is_empty() {
                continue;
            }
            explicit.insert(canonical_region(&words.join(" ")));
        }

        let mut expanded = explicit.clone();
        for token in &explicit {
            if let Some((_, province)) = CITY_PROVINCES.iter().find(|(city, _)| city == token) {
                expanded.insert(province.to_string());
            }
        }
        if expanded.iter().any(|t| CANADIAN_PROVINCES.contains(&t.as_str())) {
            expanded.insert("canada".to_string());
        }

        Self {
            remote,
            explicit,
            expanded,
            lowered,
        }
    }

    /// Does a job at `self` satisfy the accepted location `allowed`?
    pub fn satisfies(&self, allowed: &LocationProfile) -> bool {
        if allowed.remote && !self.remote {
            return false;
        }
        if allowed.explicit.is_empty() {
            return allowed.remote || allowed.lowered.is_empty();
        }
        // A remote job naming no region at all is not disqualified by one.
        if allowed.remote && self.explicit.is_empty() {
            return true;
        }
        if allowed.explicit.is_subset(&self.expanded) {
            return true;
        }
        allowed
            .explicit
            .iter()
            .all(|token| self.lowered.contains(token.as_str()))
    }
}

fn canonical_region(token: &str) -> String {
    REGION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| token.to_string())
}

/// True when `job_location` satisfies any accepted location. An empty
/// allow-list accepts everything.
pub fn location_matches<'a, I>(job_location: &str, allowed: I) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    let mut allowed = allowed.into_iter().peekable();
    if allowed.peek().is_none() {
        return true;
    }
    let job = LocationProfile::parse(job_location);
    allowed.any(|a| job.satisfies(&LocationProfile::parse(a)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(job: &str, allowed: &[&str]) -> bool {
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
        location_matches(job, &allowed)
    }

    #[test]
    fn test_empty_allow_list_accepts_all() {
        assert!(matches("Anywhere, Earth", &[]));
    }

    #[test]
    fn test_remote_matches_any_remote_job() {
        assert!(matches("Toronto, ON (Remote)", &["Remote"]));
        assert!(matches("Remote", &["remote"]));
        assert!(matches("Work from home - Calgary", &["Remote"]));
        assert!(!matches("Toronto, ON", &["Remote"]));
    }

    #[test]
    fn test_remote_with_region() {
        assert!(matches("Remote - Canada", &["Canada Remote"]));
        assert!(matches("Vancouver, BC (Remote)", &["Canada Remote"]));
        assert!(matches("Remote", &["Canada Remote"]));
        assert!(!matches("Remote, United States", &["Canada Remote"]));
        assert!(!matches("Ottawa, ON", &["Canada Remote"]));
    }

    #[test]
    fn test_province_codes_and_names() {
        assert!(matches("Ottawa, ON", &["Ontario"]));
        assert!(matches("Toronto, Ontario, Canada", &["Toronto, ON"]));
        assert!(matches("Montréal, QC", &["Montreal, Quebec"]));
        assert!(!matches("Ottawa, ON", &["Quebec"]));
    }

    #[test]
    fn test_city_implies_province_and_country() {
        assert!(matches("Calgary", &["Alberta"]));
        assert!(matches("Calgary, Alberta", &["Canada"]));
        assert!(!matches("Seattle, WA", &["Canada"]));
    }

    #[test]
    fn test_california_code_is_not_canada() {
        assert!(!matches("Los Angeles, CA", &["Canada"]));
        assert!(!matches("San Francisco, CA (Remote)", &["Canada Remote"]));
        assert!(matches("Toronto, ON, CA", &["Canada"]));
    }

    #[test]
    fn test_case_insensitive_substring_fallback() {
        assert!(matches("Greater Toronto Area", &["toronto"]));
        assert!(matches("New York, NY", &["new york"]));
    }

    #[test]
    fn test_any_of_allow_list() {
        assert!(matches("Halifax, NS", &["Toronto, ON", "Nova Scotia"]));
    }
}
