//! Input normalization and validation helpers
//!
//! Request types derive `validator::Validate`; the helpers here turn the
//! resulting errors into a single client-facing message and normalize
//! emails before they reach the credential store.

use validator::{ValidationError, ValidationErrors};

/// Normalize an email for storage and lookup.
///
/// Emails are the unique key of a user record, so `Ada@Example.com ` and
/// `ada@example.com` must resolve to the same account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Reject names that are empty once surrounding whitespace is removed.
pub fn validate_name_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Name must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Flatten validation errors into one message, e.g.
/// `"email: Must be a valid email, password: Password must be ..."`.
///
/// Fields are sorted so the message is stable across runs.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}
