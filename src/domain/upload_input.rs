use serde::{Deserialize, Serialize};

use super::{DebtPosition, Iupd, OperationKind, WorkPayload};

/// Document read from object storage describing one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "UPPERCASE")]
pub enum UploadInput {
    Create {
        #[serde(rename = "paymentPositions")]
        payment_positions: Vec<DebtPosition>,
    },
    Update {
        #[serde(rename = "paymentPositions")]
        payment_positions: Vec<DebtPosition>,
    },
    Delete {
        #[serde(rename = "paymentPositionIUPDs")]
        iupds: Vec<Iupd>,
    },
}

impl UploadInput {
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn operation(&self) -> OperationKind {
        match self {
            UploadInput::Create { .. } => OperationKind::Create,
            UploadInput::Update { .. } => OperationKind::Update,
            UploadInput::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            UploadInput::Create { payment_positions } | UploadInput::Update { payment_positions } => {
                payment_positions.len()
            }
            UploadInput::Delete { iupds } => iupds.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_payload(self) -> WorkPayload {
        match self {
            UploadInput::Create { payment_positions } | UploadInput::Update { payment_positions } => {
                WorkPayload::Records(payment_positions)
            }
            UploadInput::Delete { iupds } => WorkPayload::Ids(iupds),
        }
    }
}
