use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::{create_pool_from_url, DbPoolError, PgPool};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to build pool: {0}")]
    PoolBuild(#[from] DbPoolError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "candidate profiles and job postings",
        sql: r#"
CREATE TABLE IF NOT EXISTS fm.candidate_profiles (
    id TEXT PRIMARY KEY,
    display_name TEXT,
    skills TEXT[] NOT NULL DEFAULT '{}',
    hourly_rate DOUBLE PRECISION NOT NULL CHECK (hourly_rate > 0),
    location TEXT NOT NULL DEFAULT '',
    available BOOLEAN NOT NULL DEFAULT TRUE,
    reputation DOUBLE PRECISION CHECK (reputation IS NULL OR (reputation >= 0 AND reputation <= 5)),
    active BOOLEAN NOT NULL DEFAULT TRUE,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS fm.job_postings (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    company_name TEXT,
    employer_id TEXT NOT NULL,
    required_skills TEXT[] NOT NULL DEFAULT '{}',
    preferred_rate DOUBLE PRECISION CHECK (preferred_rate IS NULL OR preferred_rate > 0),
    location TEXT NOT NULL DEFAULT '',
    remote BOOLEAN NOT NULL DEFAULT FALSE,
    posted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    status TEXT NOT NULL DEFAULT 'open'
);
"#,
    },
    Migration {
        id: 2,
        description: "status guard + pool indexes",
        sql: r#"
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_job_status'
    ) THEN
        ALTER TABLE fm.job_postings
            ADD CONSTRAINT chk_job_status
            CHECK (status IN ('open', 'filled', 'withdrawn'));
    END IF;
END $$;

CREATE INDEX IF NOT EXISTS idx_job_postings_open
    ON fm.job_postings(posted_at DESC, id)
    WHERE status = 'open';
CREATE INDEX IF NOT EXISTS idx_candidate_profiles_active
    ON fm.candidate_profiles(lower(location), id)
    WHERE active;
"#,
    },
];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS fm;
             CREATE TABLE IF NOT EXISTS fm.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM fm.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO fm.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}

/// Builds a pool from `db_url` and applies pending migrations.
pub async fn migrate_url(db_url: &str) -> Result<PgPool, MigrationError> {
    let pool = create_pool_from_url(db_url)?;
    run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_ids_are_strictly_increasing() {
        let ids: Vec<i32> = MIGRATIONS.iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(ids.first(), Some(&1));
    }

    #[test]
    fn migrations_only_touch_the_fm_schema() {
        for migration in MIGRATIONS {
            assert!(migration.sql.contains("fm."), "migration {}", migration.id);
            assert!(!migration.description.is_empty());
        }
    }
}
