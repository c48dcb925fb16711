//! Centralized validation and helper functions.

/// Maximum number of reference sequences accepted from a single header (DOS protection)
pub const MAX_REFERENCES: usize = 100_000;

/// Security-related constants for input validation
pub const MAX_SAMPLE_NAME_LENGTH: usize = 200;

/// Check if adding another reference sequence would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new sequence.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_reference_limit(count: usize) -> Option<String> {
    if count >= MAX_REFERENCES {
        Some(format!(
            "Too many reference sequences: adding another would exceed maximum of {MAX_REFERENCES}"
        ))
    } else {
        None
    }
}

/// Validation error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Sample name too long: exceeds {MAX_SAMPLE_NAME_LENGTH} characters")]
    SampleNameTooLong,
    #[error("Invalid sample name: contains path separators or control characters")]
    InvalidSampleName,
    #[error("Empty sample name provided")]
    EmptySampleName,
}

/// Validate a sample name before it becomes part of output file names
///
/// Rejects names that could escape the output directory and sanitizes the rest by:
/// - Checking length limits
/// - Preventing directory traversal (../, ..\\)
/// - Replacing characters outside `[A-Za-z0-9._-]` with `_`
///
/// # Errors
///
/// Returns `ValidationError::EmptySampleName` if the name is blank,
/// `ValidationError::SampleNameTooLong` if it exceeds the limit, or
/// `ValidationError::InvalidSampleName` if it contains path separators, control
/// characters, or is only dots.
pub fn validate_sample_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptySampleName);
    }

    if name.len() > MAX_SAMPLE_NAME_LENGTH {
        return Err(ValidationError::SampleNameTooLong);
    }

    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(ValidationError::InvalidSampleName);
    }

    if name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidSampleName);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Hidden files are not allowed
    if sanitized.starts_with('.') {
        return Err(ValidationError::InvalidSampleName);
    }

    Ok(sanitized)
}
