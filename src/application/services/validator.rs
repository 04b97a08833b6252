use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{DebtPosition, Iupd, PaymentOption, ResponseOutcome, WorkPayload};

const MAX_IDENTIFIER_LEN: usize = 35;
const MAX_TRANSFERS: usize = 5;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,34}$").expect("valid identifier regex"));
static FISCAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{11,16}$").expect("valid fiscal code regex"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

/// Records that passed validation, plus one terminal outcome per rejected record.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub valid: WorkPayload,
    pub rejected: Vec<ResponseOutcome>,
}

/// Splits a payload into valid records and rejections. The first violated constraint
/// becomes the rejection message. Later duplicates of an already seen id are rejected.
pub fn validate(payload: WorkPayload) -> ValidationResult {
    let mut seen: HashSet<Iupd> = HashSet::new();
    let mut rejected = Vec::new();

    let valid = match payload {
        WorkPayload::Records(records) => {
            let mut valid = Vec::with_capacity(records.len());
            for record in records {
                let violation = check_unique(&record.iupd, &mut seen)
                    .and_then(|_| check_position(&record));
                match violation {
                    Ok(()) => valid.push(record),
                    Err(message) => rejected.push(ResponseOutcome::rejected(message, record.iupd)),
                }
            }
            WorkPayload::Records(valid)
        }
        WorkPayload::Ids(ids) => {
            let mut valid = Vec::with_capacity(ids.len());
            for id in ids {
                match check_unique(&id, &mut seen).and_then(|_| check_iupd(&id)) {
                    Ok(()) => valid.push(id),
                    Err(message) => rejected.push(ResponseOutcome::rejected(message, id)),
                }
            }
            WorkPayload::Ids(valid)
        }
    };

    ValidationResult { valid, rejected }
}

fn check_unique(iupd: &Iupd, seen: &mut HashSet<Iupd>) -> Result<(), String> {
    if seen.insert(iupd.clone()) {
        Ok(())
    } else {
        Err(format!("duplicate iupd {} in upload", iupd))
    }
}

fn check_iupd(iupd: &Iupd) -> Result<(), String> {
    if IDENTIFIER.is_match(iupd.as_str()) {
        Ok(())
    } else {
        Err(format!(
            "iupd must be 1-{} characters among [A-Za-z0-9_.-], starting alphanumeric",
            MAX_IDENTIFIER_LEN
        ))
    }
}

fn check_position(position: &DebtPosition) -> Result<(), String> {
    check_iupd(&position.iupd)?;

    if !FISCAL_CODE.is_match(&position.fiscal_code) {
        return Err("fiscalCode must be 11-16 alphanumeric characters".to_string());
    }
    if position.full_name.trim().is_empty() {
        return Err("fullName is required".to_string());
    }
    if position.company_name.trim().is_empty() {
        return Err("companyName is required".to_string());
    }
    if let Some(email) = &position.email {
        if !EMAIL.is_match(email) {
            return Err(format!("email {} is not a valid address", email));
        }
    }
    if position.payment_option.is_empty() {
        return Err("at least one paymentOption is required".to_string());
    }

    let mut iuvs = HashSet::new();
    for option in &position.payment_option {
        if !iuvs.insert(option.iuv.as_str()) {
            return Err(format!("duplicate iuv {}", option.iuv));
        }
        check_option(option)?;
        if let Some(validity) = position.validity_date {
            if validity > option.due_date {
                return Err(format!(
                    "validityDate must not be later than dueDate of iuv {}",
                    option.iuv
                ));
            }
        }
    }

    Ok(())
}

fn check_option(option: &PaymentOption) -> Result<(), String> {
    if option.iuv.is_empty() || option.iuv.len() > MAX_IDENTIFIER_LEN {
        return Err(format!("iuv must be 1-{} characters", MAX_IDENTIFIER_LEN));
    }
    if option.amount <= 0 {
        return Err(format!("amount of iuv {} must be positive", option.iuv));
    }
    if let Some(retention) = option.retention_date {
        if retention < option.due_date {
            return Err(format!(
                "retentionDate must not precede dueDate of iuv {}",
                option.iuv
            ));
        }
    }
    if option.transfer.is_empty() || option.transfer.len() > MAX_TRANSFERS {
        return Err(format!(
            "iuv {} must have between 1 and {} transfers",
            option.iuv, MAX_TRANSFERS
        ));
    }

    let mut ids = HashSet::new();
    let mut sum = 0i64;
    for transfer in &option.transfer {
        let in_range = transfer
            .id_transfer
            .parse::<usize>()
            .is_ok_and(|id| (1..=MAX_TRANSFERS).contains(&id));
        if !in_range {
            return Err(format!(
                "idTransfer {} must be between 1 and {}",
                transfer.id_transfer, MAX_TRANSFERS
            ));
        }
        if !ids.insert(transfer.id_transfer.as_str()) {
            return Err(format!("duplicate idTransfer {}", transfer.id_transfer));
        }
        if transfer.amount <= 0 {
            return Err(format!(
                "amount of transfer {} must be positive",
                transfer.id_transfer
            ));
        }
        if transfer.iban.is_some() == transfer.postal_iban.is_some() {
            return Err(format!(
                "transfer {} needs exactly one of iban or postalIban",
                transfer.id_transfer
            ));
        }
        sum = sum.checked_add(transfer.amount).ok_or_else(|| {
            format!("transfer amounts of iuv {} overflow", option.iuv)
        })?;
    }

    if sum != option.amount {
        return Err(format!(
            "transfer amounts ({}) do not match amount ({}) of iuv {}",
            sum, option.amount, option.iuv
        ));
    }

    Ok(())
}
