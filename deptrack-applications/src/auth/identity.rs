//! User identity and credential verification

use super::policy::AccountKind;
use crate::{ApplicationError, ApplicationResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stored user, including the credential hash
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub position: Option<String>,
    pub account_kind: AccountKind,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Check a secret against the stored hash.
    ///
    /// A malformed hash counts as a mismatch; it is never an error for the
    /// caller since the credential service must fail closed.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash).unwrap_or(false)
    }

    pub fn is_administrator(&self) -> bool {
        self.account_kind == AccountKind::Administrator
    }

    pub fn to_summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            user_type: self.account_kind,
            position: self.position.clone().unwrap_or_default(),
        }
    }
}

/// Public view of a user, as listed to administrators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub user_type: AccountKind,
    pub position: String,
}

/// Hash a password using Argon2 with a fresh salt
pub fn hash_password(password: &str) -> ApplicationResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApplicationError::Credential {
            message: format!("failed to hash password: {}", e),
        })
}

fn verify_password(password: &str, hash: &str) -> ApplicationResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| ApplicationError::Credential {
        message: format!("stored hash is not a PHC string: {}", e),
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(hash: String) -> UserAccount {
        UserAccount {
            id: 1,
            username: "staff1".to_string(),
            name: "Staff One".to_string(),
            position: None,
            account_kind: AccountKind::Member,
            password_hash: hash,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));

        let user = account(hash);
        assert!(user.verify_password("s3cret"));
        assert!(!user.verify_password("wrong"));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_malformed_hash_fails_closed() {
        let user = account("plaintext".to_string());
        assert!(!user.verify_password("plaintext"));
    }

    #[test]
    fn test_summary_blanks_missing_position() {
        let summary = account("x".to_string()).to_summary();
        assert_eq!(summary.position, "");
        assert_eq!(summary.user_type, AccountKind::Member);
    }
}
