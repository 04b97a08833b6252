use gpd_uploader::domain::{Iupd, OutcomeClass, ResponseOutcome};

#[test]
fn given_success_statuses_when_classifying_then_done() {
    assert_eq!(OutcomeClass::from_status(200), OutcomeClass::Done);
    assert_eq!(OutcomeClass::from_status(201), OutcomeClass::Done);
}

#[test]
fn given_client_error_statuses_when_classifying_then_terminal_client_error() {
    for status in [400, 404, 409, 422] {
        let class = OutcomeClass::from_status(status);
        assert_eq!(class, OutcomeClass::ClientError);
        assert!(class.is_terminal());
    }
}

#[test]
fn given_server_error_statuses_when_classifying_then_retryable() {
    for status in [500, 502, 503, 504] {
        let class = OutcomeClass::from_status(status);
        assert_eq!(class, OutcomeClass::Retryable);
        assert!(class.is_retryable());
    }
}

#[test]
fn given_unclassified_when_checking_then_retryable_not_terminal() {
    assert!(OutcomeClass::Unclassified.is_retryable());
    assert!(!OutcomeClass::Unclassified.is_terminal());
}

#[test]
fn given_class_when_round_tripping_through_str_then_same_class() {
    for class in [
        OutcomeClass::Done,
        OutcomeClass::ClientError,
        OutcomeClass::Retryable,
        OutcomeClass::Unclassified,
    ] {
        assert_eq!(class.as_str().parse::<OutcomeClass>(), Ok(class));
    }
}

#[test]
fn given_rejected_record_when_building_outcome_then_client_error_with_status_400() {
    let outcome = ResponseOutcome::rejected("bad iuv", Iupd::from("A"));

    assert_eq!(outcome.class, OutcomeClass::ClientError);
    assert_eq!(outcome.status_code, Some(400));
    assert_eq!(outcome.record_count(), 1);
}

#[test]
fn given_outcome_without_status_when_serializing_then_status_code_omitted() {
    let outcome = ResponseOutcome::unclassified("timeout", vec![Iupd::from("A")]);

    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["class"], "UNCLASSIFIED");
    assert!(json.get("statusCode").is_none());
    assert_eq!(json["recordIds"], serde_json::json!(["A"]));
}
