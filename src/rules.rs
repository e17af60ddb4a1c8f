//! Standalone validation predicates and message formatting.
//!
//! Predicates that depend on "now" take the reference instant explicitly so
//! results are reproducible; the `*_now` / `*_today` variants read the clock.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::schemas::{password_schema, phone_schema};

/// Accepted date-time layouts, tried after RFC 3339.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a date or date-time string into a UTC instant.
///
/// Accepts RFC 3339 (any offset, normalized to UTC), ISO-8601 local
/// date-times (read as UTC), and bare dates `YYYY-MM-DD` (midnight UTC).
/// Returns `None` for anything else.
pub fn parse_date(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.naive_utc());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Whether `input` parses as a date.
pub fn is_parseable_date(input: &str) -> bool {
    parse_date(input).is_some()
}

/// Whether `date` lies strictly after `now`. Unparseable dates are not in
/// the future.
pub fn is_future_date(date: &str, now: DateTime<Utc>) -> bool {
    parse_date(date).is_some_and(|parsed| parsed > now.naive_utc())
}

/// [`is_future_date`] against the current clock.
pub fn is_future_date_now(date: &str) -> bool {
    is_future_date(date, Utc::now())
}

/// Inclusive range check.
pub fn is_within_range<T: PartialOrd>(value: T, min: T, max: T) -> bool {
    min <= value && value <= max
}

/// Satisfies every password rule (length and character classes).
pub fn is_strong_password(password: &str) -> bool {
    password_schema().is_valid(&serde_json::Value::from(password))
}

/// International phone number: optional `+`, no leading zero, 7 to 15 digits.
pub fn is_valid_phone_number(phone: &str) -> bool {
    phone_schema().is_valid(&serde_json::Value::from(phone))
}

/// Completed years between `dob` and `today`; `None` if `dob` does not parse.
pub fn age_on(dob: &str, today: NaiveDate) -> Option<i32> {
    let born = parse_date(dob)?.date();
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    Some(age)
}

/// At least 18 completed years old on `today`.
pub fn is_adult(dob: &str, today: NaiveDate) -> bool {
    age_on(dob, today).is_some_and(|age| age >= 18)
}

/// [`is_adult`] against today's UTC date.
pub fn is_adult_today(dob: &str) -> bool {
    is_adult(dob, Utc::now().date_naive())
}

/// `"<Field>: <error>"` with the field name's first letter uppercased.
pub fn format_error_message(field: &str, error: &str) -> String {
    let mut chars = field.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{}: {}", capitalized, error)
}
