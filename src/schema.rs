//! Declarative schemas - per-field constraints checked against JSON input.
//!
//! A [`Schema`] is data: it enumerates the constraints of a value and, for
//! records, maps each field name to its own schema at definition time. No
//! structural introspection happens at check time.
//!
//! Checking never stops at the first problem. Every violated constraint
//! becomes an [`Issue`] carrying the path of the offending value
//! (`symptoms.0.severity`), in document order.
//!
//! ```rust
//! use carefront_errors::{EnumSchema, ObjectSchema, Schema, StringSchema};
//! use serde_json::json;
//!
//! let schema: Schema = ObjectSchema::new()
//!     .field("name", StringSchema::new().min_len(2, "Name must be at least 2 characters"))
//!     .field("severity", EnumSchema::new(["mild", "moderate", "severe"]))
//!     .into();
//!
//! let issues = schema.check(&json!({"name": "x", "severity": "mild"})).unwrap();
//! assert_eq!(issues.len(), 1);
//! assert_eq!(issues[0].path_string(), "name");
//! ```
//!
//! # Messages
//!
//! Constraint messages are given at definition time. Structural problems use
//! fixed messages:
//!
//! - missing field: `Required`
//! - wrong JSON type: `Expected string, received number`
//! - enum mismatch: `Invalid enum value. Expected 'a' | 'b', received 'c'`

use regex::Regex;
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// One step in the path to a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object field name.
    Key(String),
    /// Array index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(idx) => write!(f, "{}", idx),
        }
    }
}

/// Path from the root value to an offending value. Shallow in practice.
pub type IssuePath = SmallVec<[PathSegment; 4]>;

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Where the offending value sits.
    pub path: IssuePath,
    /// Message of the violated constraint.
    pub message: String,
}

impl Issue {
    fn at(path: &IssuePath, message: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Dot-joined path (`symptoms.0.severity`); empty for the root value.
    pub fn path_string(&self) -> String {
        let mut joined = String::new();
        for (i, segment) in self.path.iter().enumerate() {
            if i > 0 {
                joined.push('.');
            }
            joined.push_str(&segment.to_string());
        }
        joined
    }
}

/// The schema itself is malformed; no verdict about the input is possible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A pattern check holds a regex that does not compile.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Source of the regex.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// An enum schema accepts nothing.
    #[error("enum schema has no variants")]
    EmptyEnum,
}

// ============================================================================
// String Schema
// ============================================================================

/// A compiled regular expression, or the reason it failed to compile.
///
/// Compilation failures are kept rather than panicking at definition time
/// and surface as [`SchemaError::InvalidPattern`] when checked.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Ready to match.
    Compiled(Regex),
    /// Kept for reporting.
    Invalid {
        /// Source of the regex.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

impl Pattern {
    /// Compile `pattern`, keeping any failure.
    pub fn new(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => Self::Compiled(regex),
            Err(e) => Self::Invalid {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            },
        }
    }

    fn is_match(&self, s: &str) -> Result<bool, SchemaError> {
        match self {
            Self::Compiled(regex) => Ok(regex.is_match(s)),
            Self::Invalid { pattern, reason } => Err(SchemaError::InvalidPattern {
                pattern: pattern.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

const EMAIL_PATTERN: &str = r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$";
const UUID_PATTERN: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

/// A single constraint on a string value.
///
/// Every variant carries the `message` reported when the check fails.
/// Lengths count characters, not bytes.
#[derive(Debug, Clone)]
pub enum StringCheck {
    /// At least `min` characters.
    MinLen {
        /// Smallest accepted length.
        min: usize,
        /// Reported on failure.
        message: String,
    },
    /// At most `max` characters.
    MaxLen {
        /// Largest accepted length.
        max: usize,
        /// Reported on failure.
        message: String,
    },
    /// Must match the pattern somewhere (anchor it for whole-value matches).
    Pattern {
        /// Regex searched for in the value.
        pattern: Pattern,
        /// Reported on failure.
        message: String,
    },
    /// Email address: local part, `@`, dotted domain with a 2+ letter TLD.
    Email {
        /// Shape of the address; dot placement is checked separately.
        pattern: Pattern,
        /// Reported on failure.
        message: String,
    },
    /// Arbitrary predicate.
    Refine {
        /// Returns `true` for acceptable values.
        predicate: fn(&str) -> bool,
        /// Reported on failure.
        message: String,
    },
}

impl StringCheck {
    fn passes(&self, s: &str) -> Result<bool, SchemaError> {
        match self {
            Self::MinLen { min, .. } => Ok(s.chars().count() >= *min),
            Self::MaxLen { max, .. } => Ok(s.chars().count() <= *max),
            Self::Pattern { pattern, .. } => pattern.is_match(s),
            Self::Email { pattern, .. } => {
                Ok(!s.starts_with('.') && !s.contains("..") && pattern.is_match(s)?)
            }
            Self::Refine { predicate, .. } => Ok(predicate(s)),
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::MinLen { message, .. }
            | Self::MaxLen { message, .. }
            | Self::Pattern { message, .. }
            | Self::Email { message, .. }
            | Self::Refine { message, .. } => message,
        }
    }
}

/// String value with an ordered list of checks. Every failing check is
/// reported.
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    checks: Vec<StringCheck>,
}

impl StringSchema {
    /// String schema with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// At least `min` characters.
    pub fn min_len(mut self, min: usize, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::MinLen {
            min,
            message: message.into(),
        });
        self
    }

    /// At most `max` characters.
    pub fn max_len(mut self, max: usize, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::MaxLen {
            max,
            message: message.into(),
        });
        self
    }

    /// Must match `pattern`.
    pub fn pattern(mut self, pattern: &str, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::Pattern {
            pattern: Pattern::new(pattern),
            message: message.into(),
        });
        self
    }

    /// Must be an email address.
    pub fn email(mut self, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::Email {
            pattern: Pattern::new(EMAIL_PATTERN),
            message: message.into(),
        });
        self
    }

    /// Hyphenated 8-4-4-4-12 hex UUID, any version.
    pub fn uuid(self, message: impl Into<String>) -> Self {
        self.pattern(UUID_PATTERN, message)
    }

    /// Must satisfy `predicate`.
    pub fn refine(mut self, predicate: fn(&str) -> bool, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::Refine {
            predicate,
            message: message.into(),
        });
        self
    }

    /// Checks in evaluation order.
    pub fn checks(&self) -> &[StringCheck] {
        &self.checks
    }
}

// ============================================================================
// Enum, Array and Object Schemas
// ============================================================================

/// String restricted to a fixed set of variants.
#[derive(Debug, Clone)]
pub struct EnumSchema {
    variants: Vec<String>,
}

impl EnumSchema {
    /// Accept exactly `variants`.
    pub fn new<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Accepted values.
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    fn expected(&self) -> String {
        self.variants
            .iter()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Homogeneous array with an optional minimum length.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    item: Box<Schema>,
    min_items: Option<(usize, String)>,
}

impl ArraySchema {
    /// Array whose every element must satisfy `item`.
    pub fn of(item: impl Into<Schema>) -> Self {
        Self {
            item: Box::new(item.into()),
            min_items: None,
        }
    }

    /// At least `min` elements, reported at the array itself.
    pub fn min_items(mut self, min: usize, message: impl Into<String>) -> Self {
        self.min_items = Some((min, message.into()));
        self
    }

    /// Element schema.
    pub fn item(&self) -> &Schema {
        &self.item
    }
}

/// Record with an explicit, ordered field-name to schema map.
///
/// Fields absent from the map are ignored in the input.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, Schema)>,
}

impl ObjectSchema {
    /// Record with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any earlier definition under the same name.
    pub fn field(mut self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        let name = name.into();
        let schema = schema.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = schema,
            None => self.fields.push((name, schema)),
        }
        self
    }

    /// Schema of one field.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, schema)| schema)
    }

    /// Field names in definition order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Any checkable schema.
#[derive(Debug, Clone)]
pub enum Schema {
    /// A string with constraints.
    String(StringSchema),
    /// One of a fixed set of strings.
    Enum(EnumSchema),
    /// A list whose items share one schema.
    Array(ArraySchema),
    /// A record with named fields.
    Object(ObjectSchema),
}

impl From<StringSchema> for Schema {
    fn from(schema: StringSchema) -> Self {
        Self::String(schema)
    }
}

impl From<EnumSchema> for Schema {
    fn from(schema: EnumSchema) -> Self {
        Self::Enum(schema)
    }
}

impl From<ArraySchema> for Schema {
    fn from(schema: ArraySchema) -> Self {
        Self::Array(schema)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(schema: ObjectSchema) -> Self {
        Self::Object(schema)
    }
}

impl Schema {
    /// Check `value` and collect every violated constraint, in order.
    ///
    /// An empty list means the value conforms.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the schema itself is malformed.
    pub fn check(&self, value: &Value) -> Result<Vec<Issue>, SchemaError> {
        let mut issues = Vec::new();
        let mut path = IssuePath::new();
        self.check_at(Some(value), &mut path, &mut issues)?;
        Ok(issues)
    }

    /// Whether `value` conforms. A malformed schema accepts nothing.
    pub fn is_valid(&self, value: &Value) -> bool {
        matches!(self.check(value), Ok(issues) if issues.is_empty())
    }

    /// `value` is `None` when the enclosing object lacks the field.
    fn check_at(
        &self,
        value: Option<&Value>,
        path: &mut IssuePath,
        issues: &mut Vec<Issue>,
    ) -> Result<(), SchemaError> {
        let Some(value) = value else {
            if let Self::Enum(schema) = self {
                if schema.variants.is_empty() {
                    return Err(SchemaError::EmptyEnum);
                }
            }
            issues.push(Issue::at(path, "Required"));
            return Ok(());
        };

        match self {
            Self::String(schema) => {
                let Some(s) = value.as_str() else {
                    issues.push(Issue::at(path, type_mismatch("string", value)));
                    return Ok(());
                };
                for check in &schema.checks {
                    if !check.passes(s)? {
                        issues.push(Issue::at(path, check.message()));
                    }
                }
            }
            Self::Enum(schema) => {
                if schema.variants.is_empty() {
                    return Err(SchemaError::EmptyEnum);
                }
                match value.as_str() {
                    Some(s) if schema.variants.iter().any(|v| v == s) => {}
                    Some(s) => issues.push(Issue::at(
                        path,
                        format!(
                            "Invalid enum value. Expected {}, received '{}'",
                            schema.expected(),
                            s
                        ),
                    )),
                    None => issues.push(Issue::at(
                        path,
                        format!("Expected {}, received {}", schema.expected(), json_type(value)),
                    )),
                }
            }
            Self::Array(schema) => {
                let Some(items) = value.as_array() else {
                    issues.push(Issue::at(path, type_mismatch("array", value)));
                    return Ok(());
                };
                if let Some((min, message)) = &schema.min_items {
                    if items.len() < *min {
                        issues.push(Issue::at(path, message.as_str()));
                    }
                }
                for (idx, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(idx));
                    let outcome = schema.item.check_at(Some(item), path, issues);
                    path.pop();
                    outcome?;
                }
            }
            Self::Object(schema) => {
                let Some(record) = value.as_object() else {
                    issues.push(Issue::at(path, type_mismatch("object", value)));
                    return Ok(());
                };
                for (name, field) in &schema.fields {
                    path.push(PathSegment::Key(name.clone()));
                    let outcome = field.check_at(record.get(name), path, issues);
                    path.pop();
                    outcome?;
                }
            }
        }
        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_mismatch(expected: &str, value: &Value) -> String {
    format!("Expected {}, received {}", expected, json_type(value))
}
