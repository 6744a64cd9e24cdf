//! Request-shape validation built on the `validator` crate.

use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::CoreError;
use crate::permissions::is_well_formed_code;

/// Run `validator` rules on `input`, flattening failures into a single
/// [`CoreError::Validation`] message sorted by field name.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input.validate().map_err(|e| CoreError::Validation(describe(&e)))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reasons: Vec<String> = errs
                .iter()
                .map(|e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            format!("{field}: {}", reasons.join(", "))
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

/// `validator` custom rule for permission codes (`<resource>.<action>`).
pub fn validate_permission_code(code: &str) -> Result<(), ValidationError> {
    if is_well_formed_code(code) {
        Ok(())
    } else {
        let mut err = ValidationError::new("permission_code");
        err.message = Some("must look like <resource>.<action> in lowercase".into());
        Err(err)
    }
}
