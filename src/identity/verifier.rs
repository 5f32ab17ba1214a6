//! Credential verification boundary.
//!
//! Decoding bearer tokens belongs to the authentication service. The governor
//! only needs a subject and an admin flag, and treats every failure the same.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::StaticTokenConfig;

/// Claims the governor cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject_id: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("credential not recognised")]
    Unknown,

    #[error("credential malformed: {0}")]
    Malformed(String),

    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, VerifyError>;
}

/// Verifier that knows a fixed set of tokens, loaded from config.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Claims>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(entries: &[StaticTokenConfig]) -> Self {
        entries.iter().fold(Self::new(), |verifier, entry| {
            verifier.with_token(&entry.token, &entry.subject, entry.admin)
        })
    }

    pub fn with_token(mut self, token: &str, subject_id: &str, is_admin: bool) -> Self {
        self.tokens.insert(
            token.to_string(),
            Claims {
                subject_id: subject_id.to_string(),
                is_admin,
            },
        );
        self
    }
}

impl CredentialVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        self.tokens.get(token).cloned().ok_or(VerifyError::Unknown)
    }
}
