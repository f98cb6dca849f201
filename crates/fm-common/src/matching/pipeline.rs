use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::{
    scoring::{MatchResult, Ranker, RankerConfig},
    selector::{Page, PoolFilter, RankedPage, TopNSelector},
    synonyms::SynonymTable,
};
use crate::{
    repository::{ProfileRepository, RepositoryError},
    CandidateProfile, JobId, JobPosting, MatchError, ProfileId,
};

/// Pools larger than this are scored on several threads.
pub const DEFAULT_SHARD_THRESHOLD: usize = 5_000;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("candidate not found: {0}")]
    CandidateNotFound(ProfileId),
    #[error("job not found: {0}")]
    JobNotFound(JobId),
}

#[derive(Debug, Clone)]
pub struct MatchingEngineConfig {
    pub ranker: RankerConfig,
    pub shard_threshold: usize,
    pub shards: NonZeroUsize,
}

impl Default for MatchingEngineConfig {
    fn default() -> Self {
        Self {
            ranker: RankerConfig::default(),
            shard_threshold: DEFAULT_SHARD_THRESHOLD,
            shards: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobRecommendation {
    pub result: MatchResult,
    pub job: JobPosting,
}

#[derive(Debug, Clone)]
pub struct TalentRecommendation {
    pub result: MatchResult,
    pub candidate: CandidateProfile,
}

/// One page of a ranking, joined back to the records it was computed from.
#[derive(Debug, Clone)]
pub struct Recommendations<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl<T> Recommendations<T> {
    fn empty(page: Page) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            offset: page.offset,
            limit: page.limit,
        }
    }
}

/// Repository lookups plus top-N selection for a single request.
pub struct MatchingEngine {
    selector: TopNSelector,
    repository: Arc<dyn ProfileRepository>,
    shard_threshold: usize,
    shards: NonZeroUsize,
}

impl MatchingEngine {
    pub fn new(
        config: MatchingEngineConfig,
        synonyms: Arc<SynonymTable>,
        repository: Arc<dyn ProfileRepository>,
    ) -> Result<Self, EngineError> {
        let ranker = Ranker::new(config.ranker, synonyms)?;
        Ok(Self {
            selector: TopNSelector::new(ranker),
            repository,
            shard_threshold: config.shard_threshold,
            shards: config.shards,
        })
    }

    pub fn repository(&self) -> &Arc<dyn ProfileRepository> {
        &self.repository
    }

    pub fn selector(&self) -> &TopNSelector {
        &self.selector
    }

    fn shards_for(&self, pool_size: usize) -> Option<NonZeroUsize> {
        (pool_size > self.shard_threshold && self.shards.get() > 1).then_some(self.shards)
    }

    /// Best open postings for one candidate. An inactive candidate gets an
    /// empty page rather than an error.
    #[instrument(skip(self, filter, now), fields(repository = self.repository.name()))]
    pub async fn top_jobs_for_candidate(
        &self,
        candidate_id: &ProfileId,
        filter: &PoolFilter,
        page: Page,
        now: DateTime<Utc>,
    ) -> Result<Recommendations<JobRecommendation>, EngineError> {
        page.validate()?;

        let candidate = self
            .repository
            .candidate(candidate_id)
            .await?
            .ok_or_else(|| EngineError::CandidateNotFound(candidate_id.clone()))?;
        if !candidate.is_eligible() {
            info!(candidate_id = %candidate.id, "candidate is inactive; returning no jobs");
            return Ok(Recommendations::empty(page));
        }

        let pool = self.repository.eligible_jobs(filter).await?;
        let shards = self.shards_for(pool.len());
        debug!(pool_size = pool.len(), sharded = shards.is_some(), "ranking jobs");

        let ranked = match shards {
            Some(shards) => self
                .selector
                .top_jobs_sharded(&candidate, &pool, filter, page, now, shards)?,
            None => self.selector.top_jobs_page(&candidate, &pool, filter, page, now)?,
        };

        let mut by_id: HashMap<JobId, JobPosting> =
            pool.into_iter().map(|job| (job.id.clone(), job)).collect();
        Ok(join(ranked, |result| {
            by_id
                .remove(&result.job_id)
                .map(|job| JobRecommendation { result, job })
        }))
    }

    /// Best active candidates for one posting. A closed posting gets an empty
    /// page rather than an error.
    #[instrument(skip(self, filter, now), fields(repository = self.repository.name()))]
    pub async fn top_candidates_for_job(
        &self,
        job_id: &JobId,
        filter: &PoolFilter,
        page: Page,
        now: DateTime<Utc>,
    ) -> Result<Recommendations<TalentRecommendation>, EngineError> {
        page.validate()?;

        let job = self
            .repository
            .job(job_id)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;
        if !job.is_eligible() {
            info!(job_id = %job.id, status = job.status.as_str(), "job is closed; returning no candidates");
            return Ok(Recommendations::empty(page));
        }

        let pool = self.repository.eligible_candidates(filter).await?;
        let shards = self.shards_for(pool.len());
        debug!(pool_size = pool.len(), sharded = shards.is_some(), "ranking candidates");

        let ranked = match shards {
            Some(shards) => self
                .selector
                .top_candidates_sharded(&job, &pool, filter, page, now, shards)?,
            None => self.selector.top_candidates_page(&job, &pool, filter, page, now)?,
        };

        let mut by_id: HashMap<ProfileId, CandidateProfile> = pool
            .into_iter()
            .map(|candidate| (candidate.id.clone(), candidate))
            .collect();
        Ok(join(ranked, |result| {
            by_id
                .remove(&result.candidate_id)
                .map(|candidate| TalentRecommendation { result, candidate })
        }))
    }
}

fn join<T>(ranked: RankedPage, mut attach: impl FnMut(MatchResult) -> Option<T>) -> Recommendations<T> {
    Recommendations {
        items: ranked.results.into_iter().filter_map(&mut attach).collect(),
        total: ranked.total_eligible,
        offset: ranked.offset,
        limit: ranked.limit,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::repository::InMemoryRepository;
    use crate::skill_normalizer::normalize;
    use crate::JobStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    async fn seeded() -> Arc<InMemoryRepository> {
        let repo = InMemoryRepository::new();
        repo.upsert_candidate(
            CandidateProfile::new("alice", normalize(&["react", "typescript"]), 40.0, "lagos").unwrap(),
        )
        .await
        .unwrap();
        let mut bob = CandidateProfile::new("bob", normalize(&["react"]), 40.0, "lagos").unwrap();
        bob.available = false;
        repo.upsert_candidate(bob).await.unwrap();

        for (id, skills, age) in [
            ("job-react", &["react", "typescript"][..], 1),
            ("job-go", &["go"][..], 1),
            ("job-old", &["react", "typescript"][..], 60),
        ] {
            repo.upsert_job(JobPosting::new(id, "Engineer", "emp-1", normalize(skills), "lagos", now() - Duration::days(age)))
                .await
                .unwrap();
        }
        Arc::new(repo)
    }

    fn engine(repo: Arc<InMemoryRepository>, shard_threshold: usize) -> MatchingEngine {
        let config = MatchingEngineConfig {
            shard_threshold,
            shards: NonZeroUsize::new(3).unwrap(),
            ..MatchingEngineConfig::default()
        };
        MatchingEngine::new(config, Arc::new(SynonymTable::new()), repo).unwrap()
    }

    #[tokio::test]
    async fn ranks_jobs_for_a_candidate() {
        let engine = engine(seeded().await, DEFAULT_SHARD_THRESHOLD);
        let page = engine
            .top_jobs_for_candidate(&"alice".into(), &PoolFilter::default(), Page::first(10), now())
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        let ids: Vec<_> = page.items.iter().map(|item| item.job.id.as_str()).collect();
        assert_eq!(ids, vec!["job-react", "job-old", "job-go"]);
        assert!(page.items.iter().all(|item| item.result.job_id == item.job.id));
    }

    #[tokio::test]
    async fn sharded_and_sequential_engines_agree() {
        let repo = seeded().await;
        let sequential = engine(repo.clone(), DEFAULT_SHARD_THRESHOLD);
        let sharded = engine(repo, 0);

        let page = Page { offset: 1, limit: 2 };
        let a = sequential
            .top_jobs_for_candidate(&"alice".into(), &PoolFilter::default(), page, now())
            .await
            .unwrap();
        let b = sharded
            .top_jobs_for_candidate(&"alice".into(), &PoolFilter::default(), page, now())
            .await
            .unwrap();

        let scores = |r: &Recommendations<JobRecommendation>| {
            r.items.iter().map(|item| item.result.clone()).collect::<Vec<_>>()
        };
        assert_eq!(scores(&a), scores(&b));
        assert_eq!(a.total, b.total);
    }

    #[tokio::test]
    async fn unknown_actors_are_not_found() {
        let engine = engine(seeded().await, DEFAULT_SHARD_THRESHOLD);
        let err = engine
            .top_jobs_for_candidate(&"nobody".into(), &PoolFilter::default(), Page::first(5), now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CandidateNotFound(_)));

        let err = engine
            .top_candidates_for_job(&"missing".into(), &PoolFilter::default(), Page::first(5), now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_before_lookup() {
        let engine = engine(seeded().await, DEFAULT_SHARD_THRESHOLD);
        let err = engine
            .top_jobs_for_candidate(&"nobody".into(), &PoolFilter::default(), Page::first(0), now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Match(MatchError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn closed_job_gets_an_empty_page() {
        let repo = seeded().await;
        let mut job = repo.job(&"job-go".into()).await.unwrap().unwrap();
        job.close(JobStatus::Withdrawn);
        repo.upsert_job(job).await.unwrap();

        let page = engine(repo, DEFAULT_SHARD_THRESHOLD)
            .top_candidates_for_job(&"job-go".into(), &PoolFilter::default(), Page::first(5), now())
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn available_only_filter_drops_unavailable_talent() {
        let engine = engine(seeded().await, DEFAULT_SHARD_THRESHOLD);
        let filter = PoolFilter {
            available_only: true,
            ..PoolFilter::default()
        };
        let page = engine
            .top_candidates_for_job(&"job-react".into(), &filter, Page::first(5), now())
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].candidate.id.as_str(), "alice");
    }
}
