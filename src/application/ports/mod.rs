mod blob_store;
mod debt_position_api;
mod repository_error;
mod upload_repository;
mod work_queue;

pub use blob_store::{BlobStore, BlobStoreError};
pub use debt_position_api::{ApiError, ApiResponse, DebtPositionApi, SingleItem};
pub use repository_error::RepositoryError;
pub use upload_repository::UploadRepository;
pub use work_queue::{Delivery, DeliveryReceipt, QueueError, WorkQueue};
