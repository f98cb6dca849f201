use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

use super::{ProfileRepository, RepositoryError};
use crate::matching::selector::PoolFilter;
use crate::{CandidateProfile, JobId, JobPosting, ProfileId};

/// Seed file layout: `{"candidates": [...], "jobs": [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub candidates: Vec<CandidateProfile>,
    #[serde(default)]
    pub jobs: Vec<JobPosting>,
}

/// Map-backed repository for fixtures, demos and tests.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    candidates: RwLock<BTreeMap<ProfileId, CandidateProfile>>,
    jobs: RwLock<BTreeMap<JobId, JobPosting>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository from already-loaded records, validating each one.
    pub fn from_fixtures(fixtures: Fixtures) -> Result<Self, RepositoryError> {
        let mut candidates = BTreeMap::new();
        for candidate in fixtures.candidates {
            candidate.validate()?;
            candidates.insert(candidate.id.clone(), candidate);
        }

        let mut jobs = BTreeMap::new();
        for job in fixtures.jobs {
            job.validate()?;
            jobs.insert(job.id.clone(), job);
        }

        Ok(Self {
            candidates: RwLock::new(candidates),
            jobs: RwLock::new(jobs),
        })
    }

    pub fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| RepositoryError::Fixture(format!("{}: {err}", path.display())))?;
        let fixtures: Fixtures = serde_json::from_str(&raw)
            .map_err(|err| RepositoryError::Fixture(format!("{}: {err}", path.display())))?;

        info!(
            path = %path.display(),
            candidates = fixtures.candidates.len(),
            jobs = fixtures.jobs.len(),
            "loaded fixtures"
        );
        Self::from_fixtures(fixtures)
    }

    pub async fn upsert_candidate(&self, candidate: CandidateProfile) -> Result<(), RepositoryError> {
        candidate.validate()?;
        self.candidates
            .write()
            .await
            .insert(candidate.id.clone(), candidate);
        Ok(())
    }

    pub async fn upsert_job(&self, job: JobPosting) -> Result<(), RepositoryError> {
        job.validate()?;
        self.jobs.write().await.insert(job.id.clone(), job);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn candidate(&self, id: &ProfileId) -> Result<Option<CandidateProfile>, RepositoryError> {
        Ok(self.candidates.read().await.get(id).cloned())
    }

    async fn job(&self, id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn eligible_jobs(&self, filter: &PoolFilter) -> Result<Vec<JobPosting>, RepositoryError> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| filter.accepts_job(job))
            .cloned()
            .collect())
    }

    async fn eligible_candidates(
        &self,
        filter: &PoolFilter,
    ) -> Result<Vec<CandidateProfile>, RepositoryError> {
        Ok(self
            .candidates
            .read()
            .await
            .values()
            .filter(|candidate| filter.accepts_candidate(candidate))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Utc;

    use super::*;
    use crate::skill_normalizer::normalize;
    use crate::JobStatus;

    fn job(id: &str, status: JobStatus) -> JobPosting {
        let mut job = JobPosting::new(id, "Engineer", "emp-1", normalize(&["rust"]), "lagos", Utc::now());
        job.close(status);
        job
    }

    #[tokio::test]
    async fn eligible_jobs_excludes_closed_postings() {
        let repo = InMemoryRepository::new();
        repo.upsert_job(job("open", JobStatus::Open)).await.unwrap();
        repo.upsert_job(job("filled", JobStatus::Filled)).await.unwrap();

        let jobs = repo.eligible_jobs(&PoolFilter::default()).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id.as_str(), "open");
        assert!(repo.job(&"filled".into()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn upsert_rejects_invalid_records() {
        let repo = InMemoryRepository::new();
        let mut candidate = CandidateProfile::new("c1", normalize(&["rust"]), 20.0, "global").unwrap();
        candidate.hourly_rate = -1.0;

        let err = repo.upsert_candidate(candidate).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Invalid(_)));
        assert!(repo.candidate(&"c1".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn loads_fixture_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "candidates": [{{"id": "c1", "skills": ["Rust"], "hourlyRate": 30, "location": "global"}}],
                "jobs": [{{"id": "j1", "title": "Backend", "employerId": "e1", "requiredSkills": ["rust"],
                           "location": "lagos", "postedAt": "2026-09-01T00:00:00Z"}}]
            }}"#
        )
        .unwrap();

        let repo = InMemoryRepository::from_fixture_file(file.path()).unwrap();
        let candidate = repo.candidate(&"c1".into()).await.unwrap().unwrap();
        assert!(candidate.skills.contains("rust"));
        assert_eq!(repo.eligible_candidates(&PoolFilter::default()).await.unwrap().len(), 1);
    }

    #[test]
    fn malformed_fixture_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"jobs": [{{"id": "j1", "requiredSkills": "rust,go"}}]}}"#).unwrap();

        let err = InMemoryRepository::from_fixture_file(file.path()).unwrap_err();
        assert!(matches!(err, RepositoryError::Fixture(_)));
    }
}
