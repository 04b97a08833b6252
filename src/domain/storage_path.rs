use std::fmt;

use super::{BrokerId, OrganizationId};

const INPUT_DIR: &str = "input";
const OUTPUT_DIR: &str = "output";
const REPORT_PREFIX: &str = "result_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath(String);

/// Location of an uploaded input, as parsed from its object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLocation {
    pub broker_id: BrokerId,
    pub organization_id: OrganizationId,
    pub filename: String,
}

impl StoragePath {
    pub fn input(broker_id: &BrokerId, organization_id: &OrganizationId, filename: &str) -> Self {
        Self(format!("{}/{}/{}/{}", broker_id, organization_id, INPUT_DIR, filename))
    }

    /// Report written next to the input directory, named after the input file.
    pub fn report(broker_id: &BrokerId, organization_id: &OrganizationId, filename: &str) -> Self {
        Self(format!(
            "{}/{}/{}/{}{}",
            broker_id, organization_id, OUTPUT_DIR, REPORT_PREFIX, filename
        ))
    }

    pub fn from_raw(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses `{broker}/{organization}/input/{filename}`. A leading container segment is
    /// tolerated so blob URLs can be passed through after stripping the host.
    pub fn parse_input(&self) -> Option<InputLocation> {
        let segments: Vec<&str> = self.0.trim_matches('/').split('/').collect();
        let n = segments.len();
        if n < 4 || segments[n - 2] != INPUT_DIR {
            return None;
        }
        let (broker, org, filename) = (segments[n - 4], segments[n - 3], segments[n - 1]);
        if broker.is_empty() || org.is_empty() || filename.is_empty() {
            return None;
        }
        Some(InputLocation {
            broker_id: BrokerId::new(broker),
            organization_id: OrganizationId::new(org),
            filename: filename.to_string(),
        })
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
