mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    ApiSettings, DatabaseSettings, LoggingSettings, QueueSettings, ServerSettings, Settings,
    StorageProviderSetting, StorageSettings, UploadSettings,
};
