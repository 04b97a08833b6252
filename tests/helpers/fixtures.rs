use chrono::{NaiveDate, NaiveDateTime};

use gpd_uploader::domain::{
    BrokerId, DebtPosition, DebtorType, Iupd, OperationKind, OrganizationId, PaymentOption,
    StoragePath, Transfer, UploadInput, UploadKey, WorkPayload, WorkUnit,
};

pub const INPUT_FILENAME: &str = "positions.json";

pub fn org() -> OrganizationId {
    OrganizationId::new("77777777777")
}

pub fn broker() -> BrokerId {
    BrokerId::new("88888888888")
}

pub fn upload_key() -> UploadKey {
    UploadKey::new(INPUT_FILENAME)
}

pub fn input_path() -> StoragePath {
    StoragePath::input(&broker(), &org(), INPUT_FILENAME)
}

pub fn due_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 1, 31)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn transfer(id: &str, amount: i64) -> Transfer {
    Transfer {
        id_transfer: id.to_string(),
        amount,
        organization_fiscal_code: None,
        remittance_information: "TARI 2030".to_string(),
        category: "9/0101108TS/".to_string(),
        iban: Some("IT0000000000000000000000000".to_string()),
        postal_iban: None,
    }
}

pub fn position(iupd: &str) -> DebtPosition {
    DebtPosition {
        iupd: Iupd::from(iupd),
        debtor_type: DebtorType::F,
        fiscal_code: "RSSMRA80A01H501U".to_string(),
        full_name: "Mario Rossi".to_string(),
        street_name: None,
        civic_number: None,
        postal_code: None,
        city: None,
        province: None,
        region: None,
        country: None,
        email: Some("mario.rossi@example.com".to_string()),
        phone: None,
        company_name: "Comune di Roma".to_string(),
        office_name: None,
        validity_date: None,
        switch_to_expired: false,
        payment_option: vec![PaymentOption {
            iuv: format!("IUV-{}", iupd),
            amount: 1000,
            description: None,
            is_partial_payment: false,
            due_date: due_date(),
            retention_date: None,
            fee: 0,
            transfer: vec![transfer("1", 1000)],
        }],
    }
}

pub fn iupds(n: usize) -> Vec<Iupd> {
    (1..=n).map(|i| Iupd::new(format!("IUPD-{}", i))).collect()
}

pub fn positions(n: usize) -> Vec<DebtPosition> {
    iupds(n).iter().map(|id| position(id.as_str())).collect()
}

pub fn create_input(positions: Vec<DebtPosition>) -> Vec<u8> {
    serde_json::to_vec(&UploadInput::Create {
        payment_positions: positions,
    })
    .unwrap()
}

pub fn delete_input(iupds: Vec<Iupd>) -> Vec<u8> {
    serde_json::to_vec(&UploadInput::Delete { iupds }).unwrap()
}

pub fn unit(operation: OperationKind, chunk_index: u32, payload: WorkPayload) -> WorkUnit {
    WorkUnit::new(operation, upload_key(), org(), broker(), chunk_index, payload)
}

pub fn create_unit(n: usize) -> WorkUnit {
    unit(OperationKind::Create, 0, WorkPayload::Records(positions(n)))
}
