use std::cmp::Ordering;
use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};

use super::{
    location::location_matches_filter,
    scoring::{MatchResult, Ranker},
};
use crate::{CandidateProfile, JobPosting, MatchError};

/// Slice `[offset, offset + limit)` of the full ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.limit == 0 {
            return Err(MatchError::invalid_argument("n must be a positive integer"));
        }
        Ok(())
    }

    fn end(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

/// Cheap pre-filter applied before any scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolFilter {
    /// Keep members in this location; global/remote members always pass.
    pub location: Option<String>,
    /// Candidate pools only: drop profiles not currently available.
    pub available_only: bool,
}

impl PoolFilter {
    pub fn accepts_job(&self, job: &JobPosting) -> bool {
        if !job.is_eligible() {
            return false;
        }
        match self.location.as_deref() {
            Some(wanted) => location_matches_filter(&job.location, job.remote, wanted),
            None => true,
        }
    }

    pub fn accepts_candidate(&self, candidate: &CandidateProfile) -> bool {
        if !candidate.is_eligible() || (self.available_only && !candidate.available) {
            return false;
        }
        match self.location.as_deref() {
            Some(wanted) => location_matches_filter(&candidate.location, false, wanted),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedPage {
    pub results: Vec<MatchResult>,
    /// Pool members that survived filtering and were scored.
    pub total_eligible: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone)]
struct Scored<'a> {
    result: MatchResult,
    posted_at: DateTime<Utc>,
    member_id: &'a str,
}

/// matchScore desc, then newer posting first, then member id asc.
fn ranking_order(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.result
        .match_score
        .cmp(&a.result.match_score)
        .then_with(|| b.posted_at.cmp(&a.posted_at))
        .then_with(|| a.member_id.cmp(b.member_id))
}

/// Top-N selection over a pool of jobs or candidates.
pub struct TopNSelector {
    ranker: Ranker,
}

impl TopNSelector {
    pub fn new(ranker: Ranker) -> Self {
        Self { ranker }
    }

    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    /// Best `n` open jobs for `candidate`.
    pub fn top_jobs(
        &self,
        candidate: &CandidateProfile,
        pool: &[JobPosting],
        n: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchResult>, MatchError> {
        self.top_jobs_page(candidate, pool, &PoolFilter::default(), Page::first(n), now)
            .map(|page| page.results)
    }

    /// Best `n` active candidates for `job`.
    pub fn top_candidates(
        &self,
        job: &JobPosting,
        pool: &[CandidateProfile],
        n: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchResult>, MatchError> {
        self.top_candidates_page(job, pool, &PoolFilter::default(), Page::first(n), now)
            .map(|page| page.results)
    }

    pub fn top_jobs_page(
        &self,
        candidate: &CandidateProfile,
        pool: &[JobPosting],
        filter: &PoolFilter,
        page: Page,
        now: DateTime<Utc>,
    ) -> Result<RankedPage, MatchError> {
        self.select(pool, page, None, |job| self.score_job(candidate, job, filter, now))
    }

    pub fn top_candidates_page(
        &self,
        job: &JobPosting,
        pool: &[CandidateProfile],
        filter: &PoolFilter,
        page: Page,
        now: DateTime<Utc>,
    ) -> Result<RankedPage, MatchError> {
        self.select(pool, page, None, |candidate| {
            self.score_candidate(job, candidate, filter, now)
        })
    }

    /// Same result as [`top_jobs_page`](Self::top_jobs_page), scored on
    /// `shards` scoped threads and merged.
    pub fn top_jobs_sharded(
        &self,
        candidate: &CandidateProfile,
        pool: &[JobPosting],
        filter: &PoolFilter,
        page: Page,
        now: DateTime<Utc>,
        shards: NonZeroUsize,
    ) -> Result<RankedPage, MatchError> {
        self.select(pool, page, Some(shards), |job| {
            self.score_job(candidate, job, filter, now)
        })
    }

    pub fn top_candidates_sharded(
        &self,
        job: &JobPosting,
        pool: &[CandidateProfile],
        filter: &PoolFilter,
        page: Page,
        now: DateTime<Utc>,
        shards: NonZeroUsize,
    ) -> Result<RankedPage, MatchError> {
        self.select(pool, page, Some(shards), |candidate| {
            self.score_candidate(job, candidate, filter, now)
        })
    }

    fn score_job<'a>(
        &self,
        candidate: &CandidateProfile,
        job: &'a JobPosting,
        filter: &PoolFilter,
        now: DateTime<Utc>,
    ) -> Option<Scored<'a>> {
        filter.accepts_job(job).then(|| Scored {
            result: self.ranker.rank(candidate, job, now),
            posted_at: job.posted_at,
            member_id: job.id.as_str(),
        })
    }

    fn score_candidate<'a>(
        &self,
        job: &JobPosting,
        candidate: &'a CandidateProfile,
        filter: &PoolFilter,
        now: DateTime<Utc>,
    ) -> Option<Scored<'a>> {
        filter.accepts_candidate(candidate).then(|| Scored {
            result: self.ranker.rank(candidate, job, now),
            posted_at: job.posted_at,
            member_id: candidate.id.as_str(),
        })
    }

    fn select<'a, T, F>(
        &self,
        pool: &'a [T],
        page: Page,
        shards: Option<NonZeroUsize>,
        score: F,
    ) -> Result<RankedPage, MatchError>
    where
        T: Sync,
        F: Fn(&'a T) -> Option<Scored<'a>> + Sync,
    {
        page.validate()?;
        let keep = page.end();

        let (total_eligible, mut merged) = match shards {
            Some(shards) if shards.get() > 1 && pool.len() > 1 => {
                let chunk = pool.len().div_ceil(shards.get());
                let score = &score;
                let partials: Vec<(usize, Vec<Scored<'a>>)> = std::thread::scope(|scope| {
                    let handles: Vec<_> = pool
                        .chunks(chunk)
                        .map(|part| scope.spawn(move || shard_top(part, keep, score)))
                        .collect();
                    handles
                        .into_iter()
                        .map(|handle| {
                            handle
                                .join()
                                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                        })
                        .collect()
                });

                let total = partials.iter().map(|(count, _)| count).sum::<usize>();
                let mut merged: Vec<_> = partials.into_iter().flat_map(|(_, top)| top).collect();
                merged.sort_by(ranking_order);
                (total, merged)
            }
            _ => shard_top(pool, keep, &score),
        };

        merged.truncate(keep);
        let results = merged
            .into_iter()
            .skip(page.offset)
            .map(|scored| scored.result)
            .collect();

        Ok(RankedPage {
            results,
            total_eligible,
            offset: page.offset,
            limit: page.limit,
        })
    }
}

/// Scores every eligible member of `part` and keeps the best `keep`.
/// Returns the eligible count alongside the sorted partial.
fn shard_top<'a, T, F>(part: &'a [T], keep: usize, score: &F) -> (usize, Vec<Scored<'a>>)
where
    F: Fn(&'a T) -> Option<Scored<'a>>,
{
    let mut scored: Vec<_> = part.iter().filter_map(score).collect();
    let eligible = scored.len();
    scored.sort_by(ranking_order);
    scored.truncate(keep);
    (eligible, scored)
}
