use std::fmt;

use serde::Serialize;

/// Why an address failed verification. Checks run in declaration order and stop
/// at the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationFailure {
    InvalidInput,
    InvalidSyntax,
    FakePattern,
    NoMxRecord,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            VerificationFailure::InvalidInput => "Invalid input",
            VerificationFailure::InvalidSyntax => "Invalid syntax",
            VerificationFailure::FakePattern => "Fake email pattern",
            VerificationFailure::NoMxRecord => "No MX record found",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub email: String,
    pub valid: bool,
    pub reason: Option<VerificationFailure>,
    pub is_personal: bool,
    pub is_fake: bool,
    /// `None` when the routing check was not requested.
    pub mx_verified: Option<bool>,
}

impl VerificationResult {
    pub fn passed(email: &str, is_personal: bool, mx_verified: Option<bool>) -> Self {
        VerificationResult {
            email: email.to_string(),
            valid: true,
            reason: None,
            is_personal,
            is_fake: false,
            mx_verified,
        }
    }

    pub fn failed(email: &str, reason: VerificationFailure) -> Self {
        VerificationResult {
            email: email.to_string(),
            valid: false,
            reason: Some(reason),
            is_personal: false,
            is_fake: reason == VerificationFailure::FakePattern,
            mx_verified: match reason {
                VerificationFailure::NoMxRecord => Some(false),
                _ => None,
            },
        }
    }
}
