use thiserror::Error;

/// Client-side rejection of user input. No request is issued when one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Enter a valid domain.")]
    InvalidDomain,
    #[error("Reporter source is required.")]
    MissingSource,
    #[error("Confidence must be 0-100.")]
    ConfidenceOutOfRange,
    #[error("Timestamp must look like YYYY-MM-DDTHH:MM:SS.")]
    InvalidTimestamp,
    #[error("Reviewer initials required.")]
    MissingInitials,
    #[error("Reviewer initials must be at most {max} characters.")]
    InitialsTooLong { max: usize },
}

/// A domain name the API will accept: contains a dot, no whitespace.
pub(crate) fn is_valid_domain(domain: &str) -> bool {
    domain.contains('.') && !domain.chars().any(char::is_whitespace)
}

pub(crate) fn normalize_domain(input: &str) -> String {
    input.trim().to_lowercase()
}
