pub mod migrations;
pub mod pool;
pub mod profiles;
pub mod util;

pub use migrations::{migrate_url, run_migrations, MigrationError};
pub use pool::{create_pool_from_url, DbPoolError, PgPool};
pub use profiles::PgProfileRepository;
