//! Researcher credential check
//!
//! Overrides, exports and resets require an [`AdminGrant`], which can only be
//! obtained by presenting the configured credential.

use sha2::{Digest, Sha256};
use std::fmt;

/// Capability proving the caller presented the researcher credential
#[derive(Debug, Clone, Copy)]
pub struct AdminGrant {
    _private: (),
}

/// Configured researcher credential
#[derive(Clone)]
pub struct AdminCredential {
    digest: [u8; 32],
}

impl AdminCredential {
    pub fn new(password: &str) -> Self {
        Self {
            digest: digest_of(password),
        }
    }

    /// Check a presented password, issuing a grant on match
    ///
    /// Both sides are hashed first so the comparison runs over fixed-length
    /// digests and takes the same time whatever the input.
    pub fn verify(&self, presented: &str) -> Option<AdminGrant> {
        let presented = digest_of(presented);
        let diff = self
            .digest
            .iter()
            .zip(presented.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));

        (diff == 0).then_some(AdminGrant { _private: () })
    }
}

fn digest_of(secret: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(secret.as_bytes()));
    out
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminCredential(<redacted>)")
    }
}

#[cfg(test)]
pub(crate) fn test_grant() -> AdminGrant {
    AdminGrant { _private: () }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_password_yields_grant() {
        let credential = AdminCredential::new("open sesame");
        assert!(credential.verify("open sesame").is_some());
    }

    #[test]
    fn near_misses_are_rejected() {
        let credential = AdminCredential::new("1234");
        assert!(credential.verify("12345").is_none());
        assert!(credential.verify("123").is_none());
        assert!(credential.verify("").is_none());
        assert!(credential.verify("1234 ").is_none());
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let credential = AdminCredential::new("hunter2");
        assert!(!format!("{credential:?}").contains("hunter2"));
    }
}
