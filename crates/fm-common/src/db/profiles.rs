use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::{util::TimedClientExt, PgPool};
use crate::matching::selector::PoolFilter;
use crate::repository::{ProfileRepository, RepositoryError};
use crate::{CandidateProfile, JobId, JobPosting, JobStatus, ProfileId, SkillSet};

const CANDIDATE_COLUMNS: &str =
    "id, display_name, skills, hourly_rate, location, available, reputation, active";
const JOB_COLUMNS: &str = "id, title, company_name, employer_id, required_skills, preferred_rate, \
     location, remote, posted_at, status";

// Global members pass any location filter; the same rule is re-applied in
// Rust after mapping. The trim set matches `location::TAG_TRIM_CHARS`.
const LOCATION_CLAUSE: &str = "($1::text IS NULL \
     OR lower(btrim(location, E' \\t\\n\\f\\r')) IN ('global', 'remote') \
     OR lower(btrim(location, E' \\t\\n\\f\\r')) = lower(btrim($1::text, E' \\t\\n\\f\\r')))";

/// `ProfileRepository` over the `fm.candidate_profiles` and
/// `fm.job_postings` tables.
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_candidate(row: &Row) -> Result<CandidateProfile, RepositoryError> {
    let skills: Vec<String> = row.try_get("skills")?;
    let candidate = CandidateProfile {
        id: ProfileId(row.try_get("id")?),
        display_name: row.try_get("display_name")?,
        skills: skills.iter().collect::<SkillSet>(),
        hourly_rate: row.try_get("hourly_rate")?,
        location: row.try_get("location")?,
        available: row.try_get("available")?,
        reputation: row.try_get("reputation")?,
        active: row.try_get("active")?,
    };
    candidate
        .validate()
        .map_err(|err| RepositoryError::Mapping(err.to_string()))?;
    Ok(candidate)
}

fn map_job(row: &Row) -> Result<JobPosting, RepositoryError> {
    let skills: Vec<String> = row.try_get("required_skills")?;
    let raw_status: String = row.try_get("status")?;
    let status = JobStatus::parse(&raw_status)
        .ok_or_else(|| RepositoryError::Mapping(format!("unknown job status '{raw_status}'")))?;

    let job = JobPosting {
        id: JobId(row.try_get("id")?),
        title: row.try_get("title")?,
        company_name: row.try_get("company_name")?,
        employer_id: row.try_get("employer_id")?,
        required_skills: skills.iter().collect::<SkillSet>(),
        preferred_rate: row.try_get("preferred_rate")?,
        location: row.try_get("location")?,
        remote: row.try_get("remote")?,
        posted_at: row.try_get::<_, DateTime<Utc>>("posted_at")?,
        status,
    };
    job.validate()
        .map_err(|err| RepositoryError::Mapping(err.to_string()))?;
    Ok(job)
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self))]
    async fn candidate(&self, id: &ProfileId) -> Result<Option<CandidateProfile>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {CANDIDATE_COLUMNS} FROM fm.candidate_profiles WHERE id = $1");
        client
            .timed_query_opt_cached(&query, &[&id.as_str()], "candidate_by_id")
            .await?
            .as_ref()
            .map(map_candidate)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn job(&self, id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {JOB_COLUMNS} FROM fm.job_postings WHERE id = $1");
        client
            .timed_query_opt_cached(&query, &[&id.as_str()], "job_by_id")
            .await?
            .as_ref()
            .map(map_job)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn eligible_jobs(&self, filter: &PoolFilter) -> Result<Vec<JobPosting>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM fm.job_postings \
             WHERE status = 'open' AND (remote OR {LOCATION_CLAUSE}) \
             ORDER BY id"
        );
        let rows = client
            .timed_query_cached(&query, &[&filter.location], "eligible_jobs")
            .await?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in &rows {
            let job = map_job(row)?;
            if filter.accepts_job(&job) {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    #[instrument(skip(self))]
    async fn eligible_candidates(
        &self,
        filter: &PoolFilter,
    ) -> Result<Vec<CandidateProfile>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM fm.candidate_profiles \
             WHERE active AND (NOT $2 OR available) AND {LOCATION_CLAUSE} \
             ORDER BY id"
        );
        let rows = client
            .timed_query_cached(
                &query,
                &[&filter.location, &filter.available_only],
                "eligible_candidates",
            )
            .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let candidate = map_candidate(row)?;
            if filter.accepts_candidate(&candidate) {
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::location::TAG_TRIM_CHARS;

    fn sql_escape(c: char) -> String {
        match c {
            '\t' => "\\t".into(),
            '\n' => "\\n".into(),
            '\x0C' => "\\f".into(),
            '\r' => "\\r".into(),
            other => other.to_string(),
        }
    }

    #[test]
    fn location_clause_trims_like_canonical_tag() {
        let trim_set: String = TAG_TRIM_CHARS.iter().copied().map(sql_escape).collect();
        let literal = format!("E'{trim_set}'");

        assert_eq!(LOCATION_CLAUSE.matches(&literal).count(), 3);
        assert!(!LOCATION_CLAUSE.contains("(trim("));
    }
}
