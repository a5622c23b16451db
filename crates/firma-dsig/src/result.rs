#![forbid(unsafe_code)]

//! Verification outcome.

use std::fmt;

pub const MALFORMED_XML: &str = "malformed XML";
pub const NO_SIGNATURE: &str = "no signature present";
pub const MULTIPLE_SIGNATURES: &str = "multiple signatures detected";
pub const REFERENCE_MISMATCH: &str = "reference does not match document";
pub const DISALLOWED_ALGORITHM: &str = "disallowed algorithm";
pub const SIGNATURE_INVALID: &str = "signature does not validate";

/// Result of checking a signed document.
///
/// Errors are blocking and each starts with one of the fixed phrases in this
/// module, optionally followed by `: detail`. Warnings never affect `valid`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl VerificationResult {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn error(&mut self, phrase: &str, detail: Option<&dyn fmt::Display>) {
        let message = match detail {
            Some(detail) => format!("{phrase}: {detail}"),
            None => phrase.to_owned(),
        };
        log::debug!("verification error: {message}");
        self.errors.push(message);
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("verification warning: {message}");
        self.warnings.push(message);
    }

    /// Record a blocking error and close the result.
    pub(crate) fn fail(mut self, phrase: &str, detail: Option<&dyn fmt::Display>) -> Self {
        self.error(phrase, detail);
        self.finish()
    }

    pub(crate) fn finish(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }

    /// Whether any error starts with `phrase`.
    pub fn has_error(&self, phrase: &str) -> bool {
        self.errors.iter().any(|e| e.starts_with(phrase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_formats_detail() {
        let result = VerificationResult::new().fail(REFERENCE_MISMATCH, Some(&"Id not found: x"));
        assert!(!result.valid);
        assert_eq!(result.errors, ["reference does not match document: Id not found: x"]);
        assert!(result.has_error(REFERENCE_MISMATCH));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut result = VerificationResult::new();
        result.warn(MULTIPLE_SIGNATURES);
        let result = result.finish();
        assert!(result.valid);
        assert_eq!(result.warnings, [MULTIPLE_SIGNATURES]);
    }
}
