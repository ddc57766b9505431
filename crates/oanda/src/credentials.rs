//! Account credentials
//!
//! Loads account aliases from a JSON document of the form
//! `{"primary": {"id": "101-002-...", "token": "..."}}`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::CredentialsError;

/// Account identifier and bearer token for the v20 API
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub id: String,
    pub token: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
        }
    }

    fn validate(&self, alias: &str) -> Result<(), CredentialsError> {
        let invalid = |reason: &str| CredentialsError::Invalid {
            alias: alias.to_string(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("account id is empty"));
        }
        if self.token.trim().is_empty() {
            return Err(invalid("token is empty"));
        }
        if self.id.contains('/') {
            return Err(invalid("account id must not contain '/'"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Credentials keyed by account alias, validated at load time
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    accounts: BTreeMap<String, Credentials>,
}

impl CredentialStore {
    /// Load and validate a credentials file
    pub fn load(path: &Path) -> Result<Self, CredentialsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a credentials document
    pub fn from_json(json: &str) -> Result<Self, CredentialsError> {
        let accounts: BTreeMap<String, Credentials> = serde_json::from_str(json)?;
        for (alias, credentials) in &accounts {
            credentials.validate(alias)?;
        }
        Ok(Self { accounts })
    }

    pub fn get(&self, alias: &str) -> Result<&Credentials, CredentialsError> {
        self.accounts
            .get(alias)
            .ok_or_else(|| CredentialsError::UnknownAlias(alias.to_string()))
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
