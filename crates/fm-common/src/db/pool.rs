use std::str::FromStr;

use deadpool_postgres::{
    Config, CreatePoolError, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime,
};
use thiserror::Error;
use tokio_postgres::NoTls;

pub type PgPool = Pool;

const DEFAULT_POOL_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum DbPoolError {
    #[error("invalid database url: {0}")]
    InvalidConfig(String),
    #[error("failed to create database pool: {0}")]
    PoolCreation(#[from] CreatePoolError),
}

/// `FM_DB_POOL_SIZE`, falling back to 16 when unset or not a positive integer.
fn pool_size(raw: Option<&str>) -> usize {
    raw.and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_POOL_SIZE)
}

/// Builds a pool without connecting; the first checkout opens a connection.
pub fn create_pool_from_url(db_url: &str) -> Result<PgPool, DbPoolError> {
    tokio_postgres::Config::from_str(db_url)
        .map_err(|e| DbPoolError::InvalidConfig(e.to_string()))?;

    let mut cfg = Config::new();
    cfg.url = Some(db_url.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(pool_size(
        std::env::var("FM_DB_POOL_SIZE").ok().as_deref(),
    )));

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(DbPoolError::PoolCreation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_pool_without_connecting() {
        let pool = create_pool_from_url("postgres://fm:fm@localhost:5432/freelance_match").unwrap();
        assert!(pool.status().max_size > 0);
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(matches!(
            create_pool_from_url("postgres://fm@localhost:notaport/db"),
            Err(DbPoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn pool_size_falls_back_to_default() {
        assert_eq!(pool_size(None), DEFAULT_POOL_SIZE);
        assert_eq!(pool_size(Some("0")), DEFAULT_POOL_SIZE);
        assert_eq!(pool_size(Some(" 4 ")), 4);
    }
}
