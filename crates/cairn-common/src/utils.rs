//! Utility functions for Cairn

use std::sync::LazyLock;

/// Regex pattern for validating identifiers (element names, group names)
static VALID_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[a-zA-Z0-9_.:-]*$").expect("Invalid regex pattern"));

/// Validate a string contains only allowed characters
///
/// Allowed characters: alphanumeric, underscore, dot, colon, hyphen
///
/// # Examples
///
/// ```
/// use cairn_common::is_valid;
///
/// assert!(is_valid("region-1"));
/// assert!(is_valid("orders_v2:eu"));
/// assert!(!is_valid("invalid/path"));
/// assert!(!is_valid("with spaces"));
/// ```
pub fn is_valid(str: &str) -> bool {
    VALID_PATTERN.is_match(str)
}

/// Join path segments with exactly one slash between them
///
/// ```
/// use cairn_common::join_path;
///
/// assert_eq!(join_path(&["/management/experimental", "/operations/export", "42"]),
///     "/management/experimental/operations/export/42");
/// ```
pub fn join_path(segments: &[&str]) -> String {
    let mut path = String::new();
    for part in segments
        .iter()
        .flat_map(|s| s.split('/'))
        .filter(|p| !p.is_empty())
    {
        path.push('/');
        path.push_str(part);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}
