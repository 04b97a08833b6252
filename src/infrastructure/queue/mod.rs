mod in_memory_work_queue;
mod pg_work_queue;

pub use in_memory_work_queue::InMemoryWorkQueue;
pub use pg_work_queue::PgWorkQueue;
