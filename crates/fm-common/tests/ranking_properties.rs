use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fm_common::matching::{Page, PoolFilter, Ranker, RankerConfig, SynonymTable, TopNSelector};
use fm_common::skill_normalizer::normalize;
use fm_common::{CandidateProfile, JobPosting, JobStatus, SkillSet};
use proptest::prelude::*;
use proptest::test_runner::Config;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
}

fn synonyms() -> Arc<SynonymTable> {
    Arc::new(SynonymTable::new().with_pair("aa", "ab").unwrap())
}

fn ranker() -> Ranker {
    Ranker::new(RankerConfig::default(), synonyms()).unwrap()
}

fn skills() -> impl Strategy<Value = SkillSet> {
    prop::collection::vec("a[a-d]", 0..5).prop_map(|raw| normalize(&raw))
}

fn location() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["lagos", "berlin", "global", "remote"]).prop_map(String::from)
}

fn candidate() -> impl Strategy<Value = CandidateProfile> {
    (skills(), 1.0f64..300.0, location()).prop_map(|(skills, rate, location)| {
        CandidateProfile::new("cand", skills, rate, location).unwrap()
    })
}

fn job(id: String) -> impl Strategy<Value = JobPosting> {
    (
        skills(),
        prop::option::of(1.0f64..300.0),
        location(),
        any::<bool>(),
        -5i64..200,
        prop::sample::select(vec![JobStatus::Open, JobStatus::Open, JobStatus::Filled]),
    )
        .prop_map(move |(skills, rate, location, remote, age_days, status)| {
            let mut job = JobPosting::new(
                id.clone(),
                "Engineer",
                "emp",
                skills,
                location,
                now() - Duration::days(age_days),
            );
            job.preferred_rate = rate;
            job.remote = remote;
            job.close(status);
            job
        })
}

fn job_pool() -> impl Strategy<Value = Vec<JobPosting>> {
    (0usize..24).prop_flat_map(|size| {
        (0..size)
            .map(|idx| job(format!("job-{idx:02}")))
            .collect::<Vec<_>>()
    })
}

proptest! {
    #![proptest_config(Config::with_cases(128))]

    #[test]
    fn ranking_is_deterministic_and_bounded(candidate in candidate(), posting in job("j".into())) {
        let ranker = ranker();
        let first = ranker.rank(&candidate, &posting, now());
        let second = ranker.rank(&candidate, &posting, now());
        prop_assert_eq!(&first, &second);
        prop_assert!(first.match_score <= 100);
        for component in [
            first.component_scores.skill,
            first.component_scores.rate,
            first.component_scores.location,
            first.component_scores.recency,
        ] {
            prop_assert!((0.0..=1.0).contains(&component));
        }
    }

    #[test]
    fn empty_requirement_gives_full_skill_credit(candidate in candidate(), posting in job("j".into())) {
        let mut posting = posting;
        posting.required_skills = SkillSet::new();
        let result = ranker().rank(&candidate, &posting, now());
        prop_assert_eq!(result.component_scores.skill, 1.0);
    }

    #[test]
    fn gaining_a_required_skill_never_lowers_the_score(candidate in candidate(), posting in job("j".into())) {
        let ranker = ranker();
        let before = ranker.rank(&candidate, &posting, now());

        for skill in posting.required_skills.iter() {
            let mut improved = candidate.clone();
            improved.skills.insert(skill);
            let after = ranker.rank(&improved, &posting, now());
            prop_assert!(after.match_score >= before.match_score);
            prop_assert!(after.component_scores.skill >= before.component_scores.skill);
        }
    }

    #[test]
    fn selection_size_and_order_laws(candidate in candidate(), pool in job_pool(), n in 1usize..30) {
        let selector = TopNSelector::new(ranker());
        let results = selector.top_jobs(&candidate, &pool, n, now()).unwrap();

        let eligible = pool.iter().filter(|job| job.is_eligible()).count();
        prop_assert_eq!(results.len(), n.min(eligible));
        prop_assert!(results.windows(2).all(|pair| pair[0].match_score >= pair[1].match_score));
        let all_eligible = results.iter().all(|result| {
            pool.iter().any(|job| job.id == result.job_id && job.is_eligible())
        });
        prop_assert!(all_eligible);
    }

    #[test]
    fn pages_are_slices_of_the_full_ranking(
        candidate in candidate(),
        pool in job_pool(),
        offset in 0usize..30,
        limit in 1usize..10,
    ) {
        let selector = TopNSelector::new(ranker());
        let filter = PoolFilter::default();
        let full = selector
            .top_jobs_page(&candidate, &pool, &filter, Page::first(100), now())
            .unwrap();
        let page = selector
            .top_jobs_page(&candidate, &pool, &filter, Page { offset, limit }, now())
            .unwrap();

        let expected: Vec<_> = full.results.iter().skip(offset).take(limit).cloned().collect();
        prop_assert_eq!(page.results, expected);
        prop_assert_eq!(page.total_eligible, full.total_eligible);
    }

    #[test]
    fn sharded_selection_matches_sequential(
        candidate in candidate(),
        pool in job_pool(),
        shards in 1usize..6,
        limit in 1usize..12,
    ) {
        let selector = TopNSelector::new(ranker());
        let filter = PoolFilter::default();
        let page = Page { offset: 1, limit };

        let sequential = selector
            .top_jobs_page(&candidate, &pool, &filter, page, now())
            .unwrap();
        let sharded = selector
            .top_jobs_sharded(&candidate, &pool, &filter, page, now(), NonZeroUsize::new(shards).unwrap())
            .unwrap();
        prop_assert_eq!(sequential, sharded);
    }
}

#[test]
fn half_skill_overlap_scores_one_half() {
    let candidate = CandidateProfile::new("cand", normalize(&["react", "typescript"]), 40.0, "global").unwrap();
    let job = JobPosting::new("job", "Frontend", "emp", normalize(&["react", "node"]), "global", now());

    let result = Ranker::new(RankerConfig::default(), Arc::new(SynonymTable::new()))
        .unwrap()
        .rank(&candidate, &job, now());
    assert_eq!(result.component_scores.skill, 0.5);
    assert_eq!(result.component_scores.rate, 1.0);
}

#[test]
fn more_recent_posting_wins_a_tie() {
    let candidate = CandidateProfile::new("cand", normalize(&["rust"]), 40.0, "global").unwrap();
    let mut older = JobPosting::new("a-older", "Backend", "emp", normalize(&["rust"]), "global", now() - Duration::days(30));
    let mut newer = JobPosting::new("b-newer", "Backend", "emp", normalize(&["rust"]), "global", now() - Duration::days(29));
    // No recency weight, so both score the same.
    let config = RankerConfig {
        weights: fm_common::matching::Weights {
            skill: 0.8,
            rate: 0.1,
            location: 0.1,
            recency: 0.0,
        },
        ..RankerConfig::default()
    };
    older.preferred_rate = Some(40.0);
    newer.preferred_rate = Some(40.0);

    let selector = TopNSelector::new(Ranker::new(config, Arc::new(SynonymTable::new())).unwrap());
    let results = selector.top_jobs(&candidate, &[older, newer], 2, now()).unwrap();

    assert_eq!(results[0].match_score, results[1].match_score);
    assert_eq!(results[0].job_id.as_str(), "b-newer");
}
