//! Domain schemas for the hospital front-end forms.
//!
//! Each schema is built once on first use and shared for the life of the
//! process.

use std::sync::OnceLock;

use crate::rules::is_parseable_date;
use crate::schema::{ArraySchema, EnumSchema, ObjectSchema, Schema, StringSchema};

/// E.164-like: optional `+`, no leading zero, 7 to 15 digits.
pub const PHONE_PATTERN: &str = r"^\+?[1-9][0-9]{6,14}$";

/// 24-hour `HH:MM` with a two-digit hour.
pub const TIME_PATTERN: &str = r"^([01][0-9]|2[0-3]):[0-5][0-9]$";

/// Accepted `gender` values.
pub const GENDERS: [&str; 3] = ["male", "female", "other"];
/// Accepted symptom `severity` values.
pub const SEVERITIES: [&str; 3] = ["mild", "moderate", "severe"];
/// Accepted appointment `urgency` values.
pub const URGENCIES: [&str; 3] = ["routine", "urgent", "emergency"];

fn email() -> StringSchema {
    StringSchema::new().email("Invalid email address")
}

fn password() -> StringSchema {
    StringSchema::new()
        .min_len(8, "Password must be at least 8 characters")
        .pattern("[A-Z]", "Password must contain at least one uppercase letter")
        .pattern("[a-z]", "Password must contain at least one lowercase letter")
        .pattern("[0-9]", "Password must contain at least one number")
        .pattern("[^A-Za-z0-9]", "Password must contain at least one special character")
}

fn phone() -> StringSchema {
    StringSchema::new().pattern(PHONE_PATTERN, "Invalid phone number format")
}

fn date() -> StringSchema {
    StringSchema::new().refine(is_parseable_date, "Invalid date format")
}

macro_rules! cached_schema {
    ($(#[$meta:meta])* $name:ident => $build:expr) => {
        $(#[$meta])*
        pub fn $name() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            SCHEMA.get_or_init(|| $build.into())
        }
    };
}

cached_schema! {
    /// Single email address.
    email_schema => email()
}

cached_schema! {
    /// Password complexity: length plus four character classes.
    password_schema => password()
}

cached_schema! {
    /// Phone number.
    phone_schema => phone()
}

cached_schema! {
    /// Any string that parses as an ISO-8601 date or date-time.
    date_schema => date()
}

cached_schema! {
    /// Patient registration record.
    patient_schema => ObjectSchema::new()
        .field("fullName", StringSchema::new().min_len(2, "Name must be at least 2 characters"))
        .field("email", email())
        .field("dateOfBirth", date())
        .field("gender", EnumSchema::new(GENDERS))
        .field("phone", phone())
        .field("address", StringSchema::new().min_len(5, "Address must be at least 5 characters"))
}

cached_schema! {
    /// Emergency contact record.
    emergency_contact_schema => ObjectSchema::new()
        .field("name", StringSchema::new().min_len(2, "Name must be at least 2 characters"))
        .field(
            "relationship",
            StringSchema::new().min_len(2, "Relationship must be at least 2 characters"),
        )
        .field("phone", phone())
}

cached_schema! {
    /// Diagnosis request: a patient and at least one graded symptom.
    diagnosis_schema => ObjectSchema::new()
        .field("patientId", StringSchema::new().uuid("Invalid patient ID"))
        .field(
            "symptoms",
            ArraySchema::of(
                ObjectSchema::new()
                    .field(
                        "name",
                        StringSchema::new().min_len(2, "Symptom name must be at least 2 characters"),
                    )
                    .field("severity", EnumSchema::new(SEVERITIES)),
            )
            .min_items(1, "At least one symptom is required"),
        )
}

cached_schema! {
    /// Appointment booking request.
    appointment_schema => ObjectSchema::new()
        .field("specialistId", StringSchema::new().uuid("Invalid specialist ID"))
        .field("patientId", StringSchema::new().uuid("Invalid patient ID"))
        .field("date", date())
        .field("time", StringSchema::new().pattern(TIME_PATTERN, "Invalid time format"))
        .field("reason", StringSchema::new().min_len(10, "Reason must be at least 10 characters"))
        .field("urgency", EnumSchema::new(URGENCIES))
}
