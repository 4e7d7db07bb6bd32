//! Raw form submissions and per-field validation errors.
//!
//! # Responsibility
//! - Carry admin form posts as multi-valued string fields.
//! - Collect every offending field of one submission in a single error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Multi-valued string mapping, shaped like an HTML form post.
///
/// Repeated keys (for example several `author` inputs) keep their order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style single value insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, value);
        self
    }

    /// Builder-style multi value insert; an empty iterator still records the key.
    pub fn with_all<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.fields.entry(field.into()).or_default();
        entry.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(value.into());
    }

    /// First submitted value for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All submitted values for `field`, in submission order.
    pub fn get_all(&self, field: &str) -> &[String] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

/// One offending form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn required(field: &str) -> Self {
        Self::new(field, "Required")
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every offending field of one submission.
///
/// Never empty when returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Whether `field` is among the offending fields.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    /// Field -> message mapping used to redisplay a form.
    ///
    /// Multiple reasons for one field are joined with `; `.
    pub fn field_messages(&self) -> BTreeMap<String, String> {
        let mut messages: BTreeMap<String, String> = BTreeMap::new();
        for error in &self.errors {
            messages
                .entry(error.field.clone())
                .and_modify(|existing| {
                    existing.push_str("; ");
                    existing.push_str(&error.reason);
                })
                .or_insert_with(|| error.reason.clone());
        }
        messages
    }

    /// Converts an accumulated error set into a result.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(value: ValidationError) -> Self {
        Self {
            errors: vec![value],
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "invalid form input: {joined}")
    }
}

impl Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::{FormInput, ValidationError, ValidationErrors};

    #[test]
    fn repeated_fields_keep_submission_order() {
        let input = FormInput::new()
            .with("author", "Ann")
            .with("author", "Bob")
            .with("title", "T");
        assert_eq!(input.get("author"), Some("Ann"));
        assert_eq!(input.get_all("author"), ["Ann", "Bob"]);
        assert!(input.get_all("publisher").is_empty());
    }

    #[test]
    fn field_messages_join_reasons_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::required("title"));
        errors.add(ValidationError::new("author", "entry 1 must not be blank"));
        errors.add(ValidationError::new("author", "entry 3 must not be blank"));

        let messages = errors.field_messages();
        assert_eq!(messages["title"], "Required");
        assert_eq!(
            messages["author"],
            "entry 1 must not be blank; entry 3 must not be blank"
        );
    }
}
