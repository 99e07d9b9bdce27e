use std::sync::Arc;

use async_trait::async_trait;
use check_if_email_exists::{mx::check_mx, syntax::check_syntax};

use crate::domain::{
    heuristics::{DISPOSABLE_DOMAINS, FAKE_EMAIL_PREFIXES},
    split_email, has_personal_shape, EmailCandidate, VerificationFailure, VerificationResult,
};

/// Answers whether the domain of an address can receive mail.
#[async_trait]
pub trait MailRouting: Send + Sync {
    async fn has_mx_records(&self, email: &str) -> bool;
}

/// MX lookup through the system resolver. Every resolution failure (NXDOMAIN,
/// no answer, no nameservers) reads as "unverifiable".
pub struct DnsMailRouting;

#[async_trait]
impl MailRouting for DnsMailRouting {
    async fn has_mx_records(&self, email: &str) -> bool {
        let syntax = check_syntax(email);
        if !syntax.is_valid_syntax {
            return false;
        }

        match check_mx(&syntax).await {
            Ok(details) => match details.lookup {
                Ok(lookup) => lookup.iter().next().is_some(),
                Err(e) => {
                    log::debug!("No MX records for {}: {}", syntax.domain, e);
                    false
                }
            },
            Err(e) => {
                log::warn!("MX verification error for {}: {:?}", email, e);
                false
            }
        }
    }
}

#[derive(Clone)]
pub struct EmailVerifier {
    routing: Arc<dyn MailRouting>,
}

impl Default for EmailVerifier {
    fn default() -> Self {
        EmailVerifier::new(Arc::new(DnsMailRouting))
    }
}

impl EmailVerifier {
    pub fn new(routing: Arc<dyn MailRouting>) -> Self {
        EmailVerifier { routing }
    }

    /// RFC shaped syntax check, no network. The domain must be dotted.
    pub fn validate_syntax(&self, email: &str) -> bool {
        let Some((_, domain)) = split_email(email) else {
            return false;
        };
        let dotted = domain.contains('.') && domain.split('.').all(|label| !label.is_empty());

        dotted && check_syntax(email).is_valid_syntax
    }

    pub async fn verify_mx(&self, email: &str) -> bool {
        if split_email(email).is_none() {
            return false;
        }
        self.routing.has_mx_records(email).await
    }

    pub fn is_fake(&self, email: &str) -> bool {
        let email = email.to_lowercase();

        if FAKE_EMAIL_PREFIXES
            .iter()
            .any(|prefix| email.starts_with(prefix))
        {
            return true;
        }

        match split_email(&email) {
            Some((_, domain)) => DISPOSABLE_DOMAINS.contains(&domain),
            None => true,
        }
    }

    pub fn is_personal(&self, email: &str) -> bool {
        has_personal_shape(email)
    }

    /// Syntax, then fake patterns, then (optionally) MX. Stops at the first failure.
    pub async fn verify(&self, email: &str, check_routing: bool) -> VerificationResult {
        let offline = self.verify_offline(email);
        if !offline.valid || !check_routing {
            return offline;
        }

        match self.verify_mx(email).await {
            true => VerificationResult::passed(email, offline.is_personal, Some(true)),
            false => VerificationResult::failed(email, VerificationFailure::NoMxRecord),
        }
    }

    fn verify_offline(&self, email: &str) -> VerificationResult {
        if email.trim().is_empty() {
            return VerificationResult::failed(email, VerificationFailure::InvalidInput);
        }
        if !self.validate_syntax(email) {
            return VerificationResult::failed(email, VerificationFailure::InvalidSyntax);
        }
        if self.is_fake(email) {
            return VerificationResult::failed(email, VerificationFailure::FakePattern);
        }

        VerificationResult::passed(email, self.is_personal(email), None)
    }

    /// Cheap pass over every candidate (no routing lookups). Personal shaped
    /// addresses win, otherwise the first one that passed.
    pub fn best_of(&self, candidates: &[String]) -> Option<String> {
        let passed: Vec<EmailCandidate> = candidates
            .iter()
            .filter(|email| self.verify_offline(email).valid)
            .map(|email| EmailCandidate::new(email))
            .filter(|candidate| !candidate.is_tracking)
            .collect();

        passed
            .iter()
            .find(|candidate| candidate.is_personal_shape)
            .or_else(|| passed.first())
            .map(|candidate| candidate.address.clone())
    }
}
