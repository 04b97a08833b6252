mod error;
mod events;
mod health;
mod upload_status;

pub use error::ErrorResponse;
pub use events::{EventNotification, events_handler};
pub use health::{HealthResponse, health_handler};
pub use upload_status::{UploadStatusResponse, upload_status_handler};
