use crate::error::AppError;
use rusqlite::Row;
use sha2::{Digest, Sha256};

/// A registered account
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub login: String,
    /// Hex-encoded SHA-256 of the password
    pub password_hash: String,
}

impl User {
    /// Creates a user from a plain-text password
    pub fn new(login: &str, password: &str) -> Result<Self, AppError> {
        let login = login.trim();
        if login.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Login and password must be present".to_string(),
            ));
        }
        if login.len() > 100 {
            return Err(AppError::Validation(
                "Login may be at most 100 characters long".to_string(),
            ));
        }

        Ok(Self {
            login: login.to_string(),
            password_hash: hash_password(password),
        })
    }

    pub fn verify(&self, password: &str) -> bool {
        self.password_hash == hash_password(password)
    }
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl<'r> TryFrom<&Row<'r>> for User {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'r>) -> Result<Self, Self::Error> {
        Ok(User {
            login: row.get(0)?,
            password_hash: row.get(1)?,
        })
    }
}
