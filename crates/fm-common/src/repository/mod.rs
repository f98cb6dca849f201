//! Storage boundary for the matching engine.
//!
//! The engine never talks to a database client directly; it is handed an
//! `Arc<dyn ProfileRepository>` that can fetch one actor and the eligible
//! pool on the other side of the match.

mod memory;

use async_trait::async_trait;
use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;

use crate::matching::selector::PoolFilter;
use crate::{CandidateProfile, JobId, JobPosting, MatchError, ProfileId};

pub use memory::{Fixtures, InMemoryRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map row: {0}")]
    Mapping(String),
    #[error("failed to load fixtures: {0}")]
    Fixture(String),
    #[error("invalid record: {0}")]
    Invalid(#[from] MatchError),
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Implementation name for logs ("memory", "postgres").
    fn name(&self) -> &'static str;

    async fn candidate(&self, id: &ProfileId) -> Result<Option<CandidateProfile>, RepositoryError>;

    async fn job(&self, id: &JobId) -> Result<Option<JobPosting>, RepositoryError>;

    /// Open postings that pass `filter`.
    async fn eligible_jobs(&self, filter: &PoolFilter) -> Result<Vec<JobPosting>, RepositoryError>;

    /// Active profiles that pass `filter`.
    async fn eligible_candidates(
        &self,
        filter: &PoolFilter,
    ) -> Result<Vec<CandidateProfile>, RepositoryError>;

    /// Cheap liveness probe used by `/readyz`.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
