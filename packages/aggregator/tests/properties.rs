//! Property tests over the synchronous half of the pipeline.

use chrono::{DateTime, Duration, TimeZone, Utc};
use job_aggregator::pipeline::{rank, SourceBatch};
use job_aggregator::{
    matches, score, Pipeline, RawRecord, ScoringConfig, SearchCriteria, SeenSet, Source, TimeWindow,
};
use proptest::prelude::*;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::HashSet;

const TITLES: &[&str] = &[
    "Rust Engineer",
    "Senior Rust Engineer",
    "Junior Engineer",
    "Python Developer",
    "Staff Platform Engineer",
    "Office Manager",
];
const COMPANIES: &[&str] = &["Acme", "Globex", "Google", "Initech"];
const LOCATIONS: &[&str] = &["Toronto, ON", "Remote", "Vancouver, BC", "Seattle, WA"];

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

#[derive(Debug, Clone)]
struct Posting {
    id: u32,
    title: usize,
    company: usize,
    location: usize,
    minutes_ago: i64,
    salary: Option<u32>,
}

fn posting() -> impl Strategy<Value = Posting> {
    (
        0u32..30,
        0..TITLES.len(),
        0..COMPANIES.len(),
        0..LOCATIONS.len(),
        0i64..180,
        proptest::option::of(40_000u32..250_000),
    )
        .prop_map(|(id, title, company, location, minutes_ago, salary)| Posting {
            id,
            title,
            company,
            location,
            minutes_ago,
            salary,
        })
}

fn record(p: &Posting) -> RawRecord {
    let mut value = json!({
        "id": p.id.to_string(),
        "title": TITLES[p.title],
        "company": COMPANIES[p.company],
        "location": LOCATIONS[p.location],
        "job_url": format!("https://www.linkedin.com/jobs/view/{}", p.id),
        "posted_date": (now() - Duration::minutes(p.minutes_ago)).to_rfc3339(),
    });
    if let Some(salary) = p.salary {
        value["salary_min"] = json!(salary);
    }
    RawRecord::from_value(value, now())
}

fn batch(postings: &[Posting]) -> Vec<SourceBatch> {
    vec![SourceBatch {
        source: Source::LinkedIn,
        records: postings.iter().map(record).collect(),
    }]
}

fn criteria() -> SearchCriteria {
    SearchCriteria::new(TimeWindow::ONE_HOUR)
        .with_keywords(["engineer", "\"python developer\""])
        .unwrap()
        .with_exclude_keywords(["junior"])
        .unwrap()
        .with_locations(["Ontario", "Remote", "British Columbia"])
}

proptest! {
    #[test]
    fn output_has_no_duplicate_keys(postings in prop::collection::vec(posting(), 0..40)) {
        let out = Pipeline::default().process(&criteria(), batch(&postings), SeenSet::new(), now());

        let mut identity = HashSet::new();
        let mut content = HashSet::new();
        for job in &out.report.jobs {
            prop_assert!(identity.insert(job.identity_key.clone()));
            prop_assert!(content.insert(job.content_key.clone()));
        }
    }

    #[test]
    fn every_output_job_satisfies_criteria(postings in prop::collection::vec(posting(), 0..40)) {
        let c = criteria();
        let out = Pipeline::default().process(&c, batch(&postings), SeenSet::new(), now());

        for job in &out.report.jobs {
            prop_assert!(matches(job, &c, now()));
        }
    }

    #[test]
    fn output_is_ranked(postings in prop::collection::vec(posting(), 0..40)) {
        let out = Pipeline::default().process(&criteria(), batch(&postings), SeenSet::new(), now());

        for pair in out.report.jobs.windows(2) {
            prop_assert_ne!(rank(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn processing_is_deterministic(postings in prop::collection::vec(posting(), 0..40)) {
        let pipeline = Pipeline::default();
        let a = pipeline.process(&criteria(), batch(&postings), SeenSet::new(), now());
        let b = pipeline.process(&criteria(), batch(&postings), SeenSet::new(), now());

        prop_assert_eq!(a.report.jobs, b.report.jobs);
        prop_assert_eq!(a.seen, b.seen);
    }

    #[test]
    fn rerun_against_own_seen_set_surfaces_nothing(postings in prop::collection::vec(posting(), 0..40)) {
        let pipeline = Pipeline::default();
        let first = pipeline.process(&criteria(), batch(&postings), SeenSet::new(), now());
        let second = pipeline.process(&criteria(), batch(&postings), first.seen.clone(), now());

        prop_assert!(second.report.jobs.is_empty());
        prop_assert_eq!(second.seen, first.seen);
    }

    #[test]
    fn newer_posting_never_scores_lower(p in posting(), older_by in 1i64..10_000) {
        let newer = record(&p);
        let older = record(&Posting { minutes_ago: p.minutes_ago + older_by, ..p.clone() });

        let newer = job_aggregator::normalize(&newer, Source::LinkedIn).unwrap();
        let older = job_aggregator::normalize(&older, Source::LinkedIn).unwrap();
        let config = ScoringConfig::default();

        prop_assert!(score(&newer, now(), &config) >= score(&older, now(), &config));
    }
}
