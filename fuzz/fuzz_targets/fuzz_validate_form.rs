#![no_main]

use carefront_errors::{
    appointment_schema, diagnosis_schema, emergency_contact_schema, patient_schema, validate_field,
    validate_form,
};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    for schema in [
        patient_schema(),
        emergency_contact_schema(),
        diagnosis_schema(),
        appointment_schema(),
    ] {
        let form = validate_form(schema, &value);
        assert_eq!(form.is_valid, form.errors.is_none());

        let field = validate_field(schema, &value);
        assert_eq!(field.is_valid, form.is_valid);
    }
});
