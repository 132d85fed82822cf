//! Error types and handling for hydro-usage
//!
//! This module defines the error taxonomy shared by the login flow, the
//! tariff classifier and the ambient plumbing. The four protocol-level
//! failures (structural mismatch, rejected submission, broken trust chain and
//! classification invariant) are kept as separate variants so callers can
//! tell "site markup changed" from "credentials rejected" from "certificate
//! bundle stale".

use thiserror::Error;

/// Result type alias for hydro-usage operations
pub type Result<T> = std::result::Result<T, HydroError>;

/// Main error type for hydro-usage
#[derive(Debug, Error)]
pub enum HydroError {
    /// Page markup deviates from the assumed shape
    #[error("Structural mismatch: {message}")]
    StructuralMismatch { message: String },

    /// A form submission did not redirect away from its action URL
    #[error("Submission rejected: no redirect from {url}")]
    SubmissionRejected { url: String },

    /// TLS chain could not be validated against the pinned bundle
    #[error("Trust validation error: {message}")]
    TrustValidation { message: String },

    /// Tariff rule table and hour partition disagree
    #[error("Classification invariant violated: {message}")]
    ClassificationInvariant { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

/// Coarse classification of a failure, used to decide what a human has to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The provider changed its pages; report it
    ProviderChanged,
    /// Credentials (or a provider glitch) rejected the login
    LoginRejected,
    /// The pinned certificate bundle is stale or missing
    TrustBroken,
    /// Logic bug in the tariff table
    Defect,
    /// Network trouble, worth trying again later
    Transport,
    /// Local configuration, files or input data
    Environment,
}

impl HydroError {
    /// Create a new structural mismatch error
    pub fn structural<S: Into<String>>(message: S) -> Self {
        HydroError::StructuralMismatch {
            message: message.into(),
        }
    }

    /// Create a new submission rejected error
    pub fn rejected<S: Into<String>>(url: S) -> Self {
        HydroError::SubmissionRejected { url: url.into() }
    }

    /// Create a new trust validation error
    pub fn trust<S: Into<String>>(message: S) -> Self {
        HydroError::TrustValidation {
            message: message.into(),
        }
    }

    /// Create a new classification invariant error
    pub fn invariant<S: Into<String>>(message: S) -> Self {
        HydroError::ClassificationInvariant {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        HydroError::Config {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        HydroError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        HydroError::Network {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        HydroError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        HydroError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Which kind of intervention this failure calls for
    pub fn kind(&self) -> ErrorKind {
        match self {
            HydroError::StructuralMismatch { .. } => ErrorKind::ProviderChanged,
            HydroError::SubmissionRejected { .. } => ErrorKind::LoginRejected,
            HydroError::TrustValidation { .. } => ErrorKind::TrustBroken,
            HydroError::ClassificationInvariant { .. } => ErrorKind::Defect,
            HydroError::Network { .. } | HydroError::Timeout { .. } => ErrorKind::Transport,
            HydroError::Config { .. }
            | HydroError::Serialization { .. }
            | HydroError::Io { .. }
            | HydroError::Validation { .. } => ErrorKind::Environment,
        }
    }
}

impl From<std::io::Error> for HydroError {
    fn from(err: std::io::Error) -> Self {
        HydroError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HydroError {
    fn from(err: serde_yaml::Error) -> Self {
        HydroError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for HydroError {
    fn from(err: csv::Error) -> Self {
        HydroError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for HydroError {
    fn from(err: reqwest::Error) -> Self {
        if is_certificate_failure(&err) {
            return HydroError::trust(error_chain_text(&err));
        }
        if err.is_timeout() {
            return HydroError::timeout(err.to_string());
        }
        HydroError::network(error_chain_text(&err))
    }
}

impl From<chrono::ParseError> for HydroError {
    fn from(err: chrono::ParseError) -> Self {
        HydroError::validation("datetime", &err.to_string())
    }
}

/// Whether any error in the source chain reports a TLS certificate problem
///
/// reqwest does not expose the rustls error type, so the chain is inspected
/// textually. rustls renders verification failures as "invalid peer
/// certificate: ..." and handshake failures mention "certificate".
pub fn is_certificate_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        let text = e.to_string().to_lowercase();
        if text.contains("certificate") || text.contains("unknownissuer") {
            return true;
        }
        current = e.source();
    }
    false
}

fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wrapper {
        inner: std::io::Error,
    }

    impl std::fmt::Display for Wrapper {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "error sending request")
        }
    }

    impl std::error::Error for Wrapper {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.inner)
        }
    }

    #[test]
    fn test_error_creation() {
        let err = HydroError::structural("two forms");
        assert!(matches!(err, HydroError::StructuralMismatch { .. }));

        let err = HydroError::rejected("https://example.com/login");
        assert!(matches!(err, HydroError::SubmissionRejected { .. }));

        let err = HydroError::validation("field", "test validation error");
        assert!(matches!(err, HydroError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = HydroError::rejected("https://example.com/a");
        assert_eq!(
            format!("{}", err),
            "Submission rejected: no redirect from https://example.com/a"
        );

        let err = HydroError::validation("test_field", "invalid value");
        assert_eq!(
            format!("{}", err),
            "Validation error: test_field - invalid value"
        );
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        assert_eq!(
            HydroError::structural("x").kind(),
            ErrorKind::ProviderChanged
        );
        assert_eq!(HydroError::rejected("x").kind(), ErrorKind::LoginRejected);
        assert_eq!(HydroError::trust("x").kind(), ErrorKind::TrustBroken);
        assert_eq!(HydroError::invariant("x").kind(), ErrorKind::Defect);
        assert_eq!(HydroError::timeout("x").kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_certificate_failure_detected_in_source_chain() {
        let err = Wrapper {
            inner: std::io::Error::other("invalid peer certificate: UnknownIssuer"),
        };
        assert!(is_certificate_failure(&err));
        assert!(error_chain_text(&err).contains("UnknownIssuer"));

        let err = Wrapper {
            inner: std::io::Error::other("connection reset by peer"),
        };
        assert!(!is_certificate_failure(&err));
    }
}
