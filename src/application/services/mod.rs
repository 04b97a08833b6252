pub mod chunker;
mod recent_events;
mod report_publisher;
mod retry_scheduler;
mod status_aggregator;
mod submission_orchestrator;
mod upload_service;
mod upload_worker;
pub mod validator;

pub use chunker::{DEFAULT_MAX_CHUNK_SIZE, UnitTemplate};
pub use recent_events::RecentEvents;
pub use report_publisher::{ReportError, ReportPublisher};
pub use retry_scheduler::{EXHAUSTED_DETAIL, RetryPolicy, RetryScheduler, ScheduleResult};
pub use status_aggregator::{AggregationError, StatusAggregator};
pub use submission_orchestrator::SubmissionOrchestrator;
pub use upload_service::{
    AcceptOutcome, UploadError, UploadLimits, UploadService, VALIDATION_BATCH,
};
pub use upload_worker::{UploadWorker, WorkerError, WorkerOptions};
pub use validator::ValidationResult;
