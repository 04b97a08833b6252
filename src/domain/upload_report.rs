use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Iupd, OutcomeClass, UploadJob, UploadKey};

/// Final report written to object storage once every record has a terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub upload_key: UploadKey,
    pub processed_item: u64,
    pub submitted_item: u64,
    pub responses: Vec<ReportEntry>,
    pub upload_time: DateTime<Utc>,
    pub completed_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub status_code: Option<u16>,
    pub outcome: OutcomeClass,
    pub status_message: String,
    #[serde(rename = "requestIDs")]
    pub request_ids: Vec<Iupd>,
}

impl UploadReport {
    /// Groups the job's outcomes by status and message, in first-seen order.
    pub fn from_job(job: &UploadJob) -> Self {
        let mut responses: Vec<ReportEntry> = Vec::new();
        for outcome in &job.responses {
            let existing = responses.iter_mut().find(|e| {
                e.status_code == outcome.status_code
                    && e.outcome == outcome.class
                    && e.status_message == outcome.detail
            });
            match existing {
                Some(entry) => entry.request_ids.extend(outcome.record_ids.iter().cloned()),
                None => responses.push(ReportEntry {
                    status_code: outcome.status_code,
                    outcome: outcome.class,
                    status_message: outcome.detail.clone(),
                    request_ids: outcome.record_ids.clone(),
                }),
            }
        }

        Self {
            upload_key: job.upload_key.clone(),
            processed_item: job.total,
            submitted_item: job.current,
            responses,
            upload_time: job.started_at,
            completed_time: job.finished_at,
        }
    }
}
