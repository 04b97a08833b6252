use std::sync::Arc;

use crate::application::ports::UploadRepository;
use crate::application::services::UploadService;

#[derive(Clone)]
pub struct AppState {
    pub upload_service: Arc<UploadService>,
    pub upload_repository: Arc<dyn UploadRepository>,
}

impl AppState {
    pub fn new(upload_service: Arc<UploadService>) -> Self {
        let upload_repository = Arc::clone(upload_service.repository());
        Self {
            upload_service,
            upload_repository,
        }
    }
}
