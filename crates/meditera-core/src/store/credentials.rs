//! Email/password checks and salted password hashing.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::{AuthError, CoreError, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

const SALT_LEN: usize = 16;

/// Trim and lowercase `email`, rejecting anything without `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email))
    }
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword {
            min_len: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// `salt$sha256(salt || password)`, both hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    salt: String,
    digest: String,
}

impl PasswordHash {
    pub fn new(password: &str) -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        getrandom::getrandom(&mut salt)
            .map_err(|e| CoreError::Custom(format!("failed to generate salt: {e}")))?;
        let salt = hex::encode(salt);
        let digest = digest(&salt, password);
        Ok(Self { salt, digest })
    }

    pub fn verify(&self, password: &str) -> bool {
        digest(&self.salt, password) == self.digest
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}${}", self.salt, self.digest)
    }
}

impl FromStr for PasswordHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (salt, digest) = s
            .split_once('$')
            .ok_or_else(|| CoreError::Custom("malformed password hash".into()))?;
        Ok(Self {
            salt: salt.to_string(),
            digest: digest.to_string(),
        })
    }
}
