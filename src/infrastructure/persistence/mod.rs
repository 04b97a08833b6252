mod pg_pool;
mod repositories;

pub use repositories::InMemoryUploadRepository;
pub use repositories::PgUploadRepository;

pub use pg_pool::{PoolConfig, create_pool, run_migrations};
