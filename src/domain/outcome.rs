use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Iupd;

/// Classification of one submission result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeClass {
    Done,
    ClientError,
    Retryable,
    /// Transport failed before any response was obtained.
    Unclassified,
}

impl OutcomeClass {
    /// Maps an HTTP status of the debt-position API to an outcome class.
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => OutcomeClass::Done,
            400..=499 => OutcomeClass::ClientError,
            _ => OutcomeClass::Retryable,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OutcomeClass::Done | OutcomeClass::ClientError)
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeClass::Done => "DONE",
            OutcomeClass::ClientError => "CLIENT_ERROR",
            OutcomeClass::Retryable => "RETRYABLE",
            OutcomeClass::Unclassified => "UNCLASSIFIED",
        }
    }
}

impl FromStr for OutcomeClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DONE" => Ok(OutcomeClass::Done),
            "CLIENT_ERROR" => Ok(OutcomeClass::ClientError),
            "RETRYABLE" => Ok(OutcomeClass::Retryable),
            "UNCLASSIFIED" => Ok(OutcomeClass::Unclassified),
            _ => Err(format!("Invalid outcome class: {}", s)),
        }
    }
}

impl fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One classification applied to one or more record ids processed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseOutcome {
    pub class: OutcomeClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub detail: String,
    pub record_ids: Vec<Iupd>,
}

impl ResponseOutcome {
    pub fn new(
        class: OutcomeClass,
        status_code: Option<u16>,
        detail: impl Into<String>,
        record_ids: Vec<Iupd>,
    ) -> Self {
        Self {
            class,
            status_code,
            detail: detail.into(),
            record_ids,
        }
    }

    pub fn from_status(status: u16, detail: impl Into<String>, record_ids: Vec<Iupd>) -> Self {
        Self::new(OutcomeClass::from_status(status), Some(status), detail, record_ids)
    }

    pub fn rejected(detail: impl Into<String>, record_id: Iupd) -> Self {
        Self::new(OutcomeClass::ClientError, Some(400), detail, vec![record_id])
    }

    pub fn unclassified(detail: impl Into<String>, record_ids: Vec<Iupd>) -> Self {
        Self::new(OutcomeClass::Unclassified, None, detail, record_ids)
    }

    pub fn record_count(&self) -> usize {
        self.record_ids.len()
    }
}
