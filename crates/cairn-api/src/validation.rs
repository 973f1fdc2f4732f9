//! Input validation utilities for configuration elements

use validator::ValidationError;

use cairn_common::is_valid;

/// Maximum length for element names
pub const MAX_ELEMENT_NAME_LENGTH: usize = 256;

/// Maximum length for group names
pub const MAX_GROUP_LENGTH: usize = 128;

/// Validate an element name
///
/// Names must:
/// - Not be empty
/// - Not exceed MAX_ELEMENT_NAME_LENGTH characters
/// - Contain only alphanumeric characters, dots, colons, hyphens, and underscores
pub fn validate_element_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name_empty")
            .with_message("Name of the element has to be specified.".into()));
    }
    if name.len() > MAX_ELEMENT_NAME_LENGTH {
        return Err(ValidationError::new("name_too_long").with_message(
            format!(
                "Name of the element must not exceed {} characters.",
                MAX_ELEMENT_NAME_LENGTH
            )
            .into(),
        ));
    }
    if !is_valid(name) {
        return Err(ValidationError::new("name_invalid_chars").with_message(
            "Name of the element may only contain alphanumeric characters, '.', ':', '-' and '_'."
                .into(),
        ));
    }
    Ok(())
}

/// Validate a group name supplied on a create request
pub fn validate_group(group: &str) -> Result<(), ValidationError> {
    if group.contains(',') {
        return Err(ValidationError::new("group_contains_comma")
            .with_message("Group name should not contain comma.".into()));
    }
    if group.len() > MAX_GROUP_LENGTH {
        return Err(ValidationError::new("group_too_long").with_message(
            format!("Group name must not exceed {} characters.", MAX_GROUP_LENGTH).into(),
        ));
    }
    if !is_valid(group) {
        return Err(ValidationError::new("group_invalid_chars").with_message(
            "Group name may only contain alphanumeric characters, '.', ':', '-' and '_'.".into(),
        ));
    }
    Ok(())
}

/// Validate a port range
pub fn validate_port_range(start: u16, end: u16) -> Result<(), ValidationError> {
    if start == 0 || end == 0 {
        return Err(ValidationError::new("port_invalid")
            .with_message("Ports must be greater than 0.".into()));
    }
    if start > end {
        return Err(ValidationError::new("port_range_invalid")
            .with_message("Start port must not be greater than end port.".into()));
    }
    Ok(())
}

/// Human-readable text for a validation error
pub fn validation_message(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}
