mod debt_position;
mod identifiers;
mod operation;
mod outcome;
mod storage_path;
mod upload_input;
mod upload_job;
mod upload_report;
mod work_unit;

pub use debt_position::{DebtPosition, DebtorType, PaymentOption, Transfer};
pub use identifiers::{BrokerId, Iupd, OrganizationId, UploadKey};
pub use operation::OperationKind;
pub use outcome::{OutcomeClass, ResponseOutcome};
pub use storage_path::{InputLocation, StoragePath};
pub use upload_input::UploadInput;
pub use upload_job::{MergeEffect, UploadJob};
pub use upload_report::{ReportEntry, UploadReport};
pub use work_unit::{WorkPayload, WorkUnit};
