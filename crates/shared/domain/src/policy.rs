//! Password strength policy.

use serde::{Deserialize, Serialize};

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Minimum requirements a new password must meet.
///
/// The same policy value is applied at registration, password reset and
/// password change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

impl PasswordPolicy {
    /// Check a candidate password, reporting the first unmet requirement.
    pub fn validate(&self, password: &str) -> DomainResult<()> {
        if password.chars().count() < self.min_length {
            return Err(DomainError::weak_password(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }
        if self.require_uppercase && !password.chars().any(char::is_uppercase) {
            return Err(DomainError::weak_password(
                "Password must contain at least one uppercase letter",
            ));
        }
        if self.require_lowercase && !password.chars().any(char::is_lowercase) {
            return Err(DomainError::weak_password(
                "Password must contain at least one lowercase letter",
            ));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(DomainError::weak_password(
                "Password must contain at least one digit",
            ));
        }
        if self.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            return Err(DomainError::weak_password(
                "Password must contain at least one special character",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_accepts_strong_password() {
        assert!(PasswordPolicy::default().validate("Str0ng!Pass").is_ok());
    }

    #[test]
    fn test_default_policy_rejects_each_missing_class() {
        let policy = PasswordPolicy::default();
        let cases = [
            ("Sh0rt!", "at least 8"),
            ("str0ng!pass", "uppercase"),
            ("STR0NG!PASS", "lowercase"),
            ("Strong!Pass", "digit"),
            ("Str0ngPass1", "special"),
        ];

        for (password, fragment) in cases {
            let err = policy.validate(password).unwrap_err();
            assert!(
                matches!(&err, DomainError::WeakPassword(msg) if msg.contains(fragment)),
                "{password}: unexpected {err:?}"
            );
        }
    }

    #[test]
    fn test_relaxed_policy_only_checks_length() {
        let policy = PasswordPolicy {
            min_length: 4,
            require_uppercase: false,
            require_lowercase: false,
            require_digit: false,
            require_special: false,
        };

        assert!(policy.validate("abcd").is_ok());
        assert!(policy.validate("abc").is_err());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let policy = PasswordPolicy {
            min_length: 4,
            ..PasswordPolicy::default()
        };
        // Four characters, more than four bytes
        assert!(policy.validate("Ä1é!").is_ok());
    }
}
