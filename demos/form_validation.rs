use carefront_errors::{
    Schema, appointment_schema, format_error_message, is_adult_today, is_strong_password,
    patient_schema, validate_field, validate_form,
};
use serde_json::json;

fn main() {
    println!("--- Form Validation Example ---\n");

    // 1. Whole-form validation: every violation, keyed by path
    let booking = json!({
        "specialistId": "not-a-uuid",
        "patientId": "123e4567-e89b-12d3-a456-426614174000",
        "date": "2030-01-01",
        "time": "9:00",
        "reason": "short",
        "urgency": "routine"
    });
    let result = validate_form(appointment_schema(), &booking);
    println!("1. Appointment form valid: {}", result.is_valid);
    for (field, error) in result.errors.iter().flatten() {
        println!("   {}", format_error_message(field, error));
    }

    // 2. Single field on blur: first violation only
    if let Schema::Object(record) = patient_schema() {
        let email = record.validate_field("email", &json!("amara@"));
        println!("\n2. Email on blur: {}", serde_json::to_string(&email).unwrap_or_default());
    }

    // 3. Same pipeline, any schema
    let password = json!("weak");
    let field = validate_field(carefront_errors::password_schema(), &password);
    println!("\n3. Password check: {:?}", field.error);

    // 4. Standalone predicates
    println!("\n4. Predicates:");
    println!("   strong password 'Secur3!pass': {}", is_strong_password("Secur3!pass"));
    println!("   adult born 2010-01-01: {}", is_adult_today("2010-01-01"));

    // 5. Failed form into the error taxonomy
    if let Some(err) = result.into_error() {
        println!("\n5. As error: {}", err.to_json());
    }
}
