use super::heuristics::{matches_domain_list, EXCLUDED_EMAIL_DOMAINS};

/// Splits an address at its last `@`. Both halves must be non-empty.
pub fn split_email(email: &str) -> Option<(&str, &str)> {
    match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Some((local, domain)),
        _ => None,
    }
}

/// firstname.lastname / firstname_lastname shaped local part.
pub fn has_personal_shape(email: &str) -> bool {
    let Some((local, _)) = split_email(email) else {
        return false;
    };
    let local = local.to_lowercase();
    let name_pieces: Vec<&str> = local.split(['.', '_']).collect();

    name_pieces.len() == 2
        && name_pieces
            .iter()
            .all(|piece| !piece.is_empty() && piece.chars().all(char::is_alphabetic))
}

/// A raw address found on a page plus what we learned about it while picking the
/// best one. Dropped once the best candidate is chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailCandidate {
    pub address: String,
    pub is_tracking: bool,
    pub is_personal_shape: bool,
    pub mx_valid: Option<bool>,
}

impl EmailCandidate {
    pub fn new(address: &str) -> Self {
        let address = address.trim().to_lowercase();
        let is_tracking = split_email(&address)
            .map(|(_, domain)| matches_domain_list(domain, EXCLUDED_EMAIL_DOMAINS))
            .unwrap_or(false);
        let is_personal_shape = has_personal_shape(&address);

        EmailCandidate {
            address,
            is_tracking,
            is_personal_shape,
            mx_valid: None,
        }
    }

    pub fn local_part(&self) -> &str {
        split_email(&self.address).map_or("", |(local, _)| local)
    }

    pub fn domain(&self) -> &str {
        split_email(&self.address).map_or("", |(_, domain)| domain)
    }
}
