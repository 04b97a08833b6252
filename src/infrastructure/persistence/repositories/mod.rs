mod in_memory_upload_repository;
mod pg_upload_repository;

pub use in_memory_upload_repository::InMemoryUploadRepository;
pub use pg_upload_repository::PgUploadRepository;
