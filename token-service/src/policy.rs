use crate::oidc::VerifiedIdentity;

/// Only verified addresses inside one email domain may receive a token.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    suffix: String,
}

impl DomainPolicy {
    pub fn new(allowed_domain: &str) -> Self {
        let domain = allowed_domain.trim().trim_start_matches('@');
        Self {
            suffix: format!("@{}", domain.to_ascii_lowercase()),
        }
    }

    pub fn allowed_domain(&self) -> &str {
        &self.suffix[1..]
    }

    pub fn permits(&self, identity: &VerifiedIdentity) -> bool {
        identity.email_verified && identity.email.to_ascii_lowercase().ends_with(&self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str, verified: bool) -> VerifiedIdentity {
        VerifiedIdentity {
            email: email.to_string(),
            email_verified: verified,
            nonce: None,
        }
    }

    #[test]
    fn matches_domain_case_insensitively() {
        let policy = DomainPolicy::new("Student.Chula.ac.th");
        assert!(policy.permits(&identity("6530000021@student.chula.ac.th", true)));
        assert!(policy.permits(&identity("Someone@STUDENT.CHULA.AC.TH", true)));
        assert_eq!(policy.allowed_domain(), "student.chula.ac.th");
    }

    #[test]
    fn rejects_unverified_and_foreign_addresses() {
        let policy = DomainPolicy::new("student.chula.ac.th");
        assert!(!policy.permits(&identity("someone@student.chula.ac.th", false)));
        assert!(!policy.permits(&identity("someone@chula.ac.th", true)));
        assert!(!policy.permits(&identity("someone@evilstudent.chula.ac.th", true)));
        assert!(!policy.permits(&identity("student.chula.ac.th", true)));
        assert!(!policy.permits(&identity("", true)));
    }
}
