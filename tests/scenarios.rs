//! End-to-end scenarios: a page reports failures through the dispatcher,
//! observers log and remember them, forms are validated before submission.

use carefront_errors::{
    ClassifiedError, ErrorDispatcher, ErrorKind, ErrorLogger, FieldValidationResult,
    FormValidationResult, RingBufferLogger, Settings, appointment_schema, classify,
    classify_http_status, diagnosis_schema, format_error_message, is_adult, patient_schema,
    phone_schema, validate_field, validate_form,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const SPECIALIST_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const PATIENT_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

#[test]
fn taxonomy_table() {
    let table: Vec<(&str, u16)> = ErrorKind::ALL
        .iter()
        .map(|kind| (kind.code(), kind.default_status().value()))
        .collect();
    assert_eq!(
        table,
        vec![
            ("VALIDATION_ERROR", 400),
            ("AUTHENTICATION_ERROR", 401),
            ("AUTHORIZATION_ERROR", 403),
            ("NOT_FOUND_ERROR", 404),
            ("CONFLICT_ERROR", 409),
            ("UNKNOWN_ERROR", 500),
        ]
    );
}

#[test]
fn wire_shape_of_classified_error() {
    let err = ClassifiedError::not_found("Patient not found").with_detail("patientId", PATIENT_ID);
    assert_eq!(
        err.to_json(),
        json!({
            "message": "Patient not found",
            "code": "NOT_FOUND_ERROR",
            "statusCode": 404,
            "details": {"patientId": PATIENT_ID}
        })
    );

    let bare = ClassifiedError::from_kind(ErrorKind::Authorization);
    assert_eq!(
        bare.to_json(),
        json!({"message": "Not authorized", "code": "AUTHORIZATION_ERROR", "statusCode": 403})
    );
}

#[test]
fn opaque_failure_is_wrapped() {
    let err = classify(json!({"weird": true}));
    assert_eq!(err.message(), "An unknown error occurred");
    assert_eq!(err.status_code().value(), 500);
    assert_eq!(err.detail("originalFailure"), Some(&json!({"weird": true})));
}

#[test]
fn dispatch_pipeline_logs_and_remembers() {
    let dispatcher = ErrorDispatcher::new();
    let logger = ErrorLogger::new();
    let history = RingBufferLogger::new(8, 1024);
    let toasts = Arc::new(Mutex::new(Vec::new()));

    let log_sub = dispatcher.add_shared_listener(logger.observer());
    let history_sub = dispatcher.add_shared_listener(history.observer("appointments"));
    let toast_sub = {
        let toasts = Arc::clone(&toasts);
        dispatcher.add_listener(move |err| {
            toasts.lock().unwrap().push(format!("{}: {}", err.code(), err.message()));
        })
    };

    let returned = dispatcher.handle(classify_http_status(409, Some("Slot already booked")));
    assert_eq!(returned.kind(), ErrorKind::Conflict);
    let _ = dispatcher.handle(std::io::Error::other("connection reset"));

    assert_eq!(logger.logged_count(), 2);
    assert_eq!(history.len(), 2);
    assert_eq!(
        toasts.lock().unwrap().clone(),
        vec![
            "CONFLICT_ERROR: Slot already booked".to_string(),
            "UNKNOWN_ERROR: connection reset".to_string(),
        ]
    );

    let recent = history.get_recent(1);
    assert_eq!(recent[0].code, "UNKNOWN_ERROR");
    assert_eq!(recent[0].origin.as_ref(), "appointments");

    toast_sub.dispose();
    let _ = dispatcher.handle(ClassifiedError::authentication("Session expired"));
    assert_eq!(toasts.lock().unwrap().len(), 2);
    assert_eq!(history.len(), 3);

    log_sub.dispose();
    history_sub.dispose();
    assert_eq!(dispatcher.listener_count(), 0);
    assert_eq!(dispatcher.handled_count(), 3);
}

#[test]
fn panicking_observer_does_not_block_others() {
    let dispatcher = ErrorDispatcher::new();
    let reached = Arc::new(Mutex::new(false));

    let _bad = dispatcher.add_listener(|_| panic!("toast renderer crashed"));
    let _good = {
        let reached = Arc::clone(&reached);
        dispatcher.add_listener(move |_| *reached.lock().unwrap() = true)
    };

    let err = dispatcher.handle(ClassifiedError::validation("Invalid time format", None));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(*reached.lock().unwrap());
    assert_eq!(dispatcher.observer_panic_count(), 1);
}

#[test]
fn phone_field_scenario() {
    let rejected = validate_field(phone_schema(), &json!("12345"));
    assert_eq!(rejected, FieldValidationResult::invalid("Invalid phone number format"));

    let accepted = validate_field(phone_schema(), &json!("+14155551234"));
    assert_eq!(accepted, FieldValidationResult::valid());
}

#[test]
fn appointment_form_scenario() {
    let result = validate_form(
        appointment_schema(),
        &json!({
            "specialistId": "not-a-uuid",
            "patientId": PATIENT_ID,
            "date": "2030-01-01",
            "time": "9:00",
            "reason": "short",
            "urgency": "routine"
        }),
    );

    let expected: BTreeMap<String, String> = [
        ("reason", "Reason must be at least 10 characters"),
        ("specialistId", "Invalid specialist ID"),
        ("time", "Invalid time format"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    assert_eq!(
        result,
        FormValidationResult {
            is_valid: false,
            errors: Some(expected),
        }
    );
}

#[test]
fn valid_appointment_passes() {
    let result = validate_form(
        appointment_schema(),
        &json!({
            "specialistId": SPECIALIST_ID,
            "patientId": PATIENT_ID,
            "date": "2030-01-01",
            "time": "09:00",
            "reason": "Follow-up on cardiology referral",
            "urgency": "urgent"
        }),
    );
    assert_eq!(result, FormValidationResult::valid());
}

#[test]
fn one_entry_per_violating_path() {
    let result = validate_form(
        diagnosis_schema(),
        &json!({
            "patientId": "p-1",
            "symptoms": [
                {"name": "cough", "severity": "mild"},
                {"name": "x", "severity": "catastrophic"}
            ]
        }),
    );
    assert_eq!(result.error_count(), 3);
    assert_eq!(result.error("patientId"), Some("Invalid patient ID"));
    assert_eq!(
        result.error("symptoms.1.name"),
        Some("Symptom name must be at least 2 characters")
    );
    assert!(result.error("symptoms.1.severity").is_some());
    assert!(result.error("symptoms.0.name").is_none());
}

#[test]
fn patient_field_on_blur() {
    let schema = match patient_schema() {
        carefront_errors::Schema::Object(record) => record,
        other => panic!("patient schema is not a record: {other:?}"),
    };
    assert_eq!(
        schema.validate_field("email", &json!("amara@")),
        FieldValidationResult::invalid("Invalid email address")
    );
    assert!(schema.validate_field("nickname", &json!("anything")).is_valid);

    let message = format_error_message("email", "Invalid email address");
    assert_eq!(message, "Email: Invalid email address");
}

#[test]
fn failed_form_flows_into_dispatcher() {
    let dispatcher = ErrorDispatcher::new();
    let history = RingBufferLogger::new(4, 1024);
    let _sub = dispatcher.add_shared_listener(history.observer("patient-registration"));

    let result = validate_form(patient_schema(), &json!({"fullName": "Amara Okafor"}));
    let err = result.into_error().unwrap();
    let handled = dispatcher.handle(err);

    assert_eq!(handled.code(), "VALIDATION_ERROR");
    assert!(handled.is_recoverable());
    let entry = &history.get_all()[0];
    assert_eq!(entry.status, 400);
    assert!(entry.details.iter().any(|(key, _)| key.as_ref() == "fields"));
}

#[test]
fn adult_scenario() {
    let in_2024 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert!(!is_adult("2010-01-01", in_2024));
    assert!(is_adult("2004-03-01", in_2024));
}

#[test]
fn settings_build_history() {
    let settings = Settings::default();
    let history = settings.history();
    assert_eq!(history.capacity(), 256);
    assert!(history.is_empty());
}
