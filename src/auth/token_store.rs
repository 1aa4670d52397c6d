use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::AuthProvider;

const SECRETS_FILE_NAME: &str = "secrets.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp in seconds
    pub expires_at: i64,
}

impl AuthConfig {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp()
    }
}

/// Reads tokens written by an external authorization tool.
pub struct TokenStore {
    file_path: PathBuf,
}

impl TokenStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            file_path: config_dir.join(SECRETS_FILE_NAME),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Save tokens to the secrets file
    pub fn save_tokens(&self, tokens: &AuthConfig) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let serialized = serde_json::to_string(tokens)?;
        fs::write(&self.file_path, serialized)?;
        Ok(())
    }

    /// Load tokens from the secrets file
    pub fn load_tokens(&self) -> Result<AuthConfig> {
        if !self.file_path.exists() {
            return Err(anyhow!("No tokens found in {}", self.file_path.display()));
        }
        let data = fs::read_to_string(&self.file_path)?;
        let config: AuthConfig =
            serde_json::from_str(&data).context("Failed to parse secrets file")?;
        Ok(config)
    }
}

/// [`AuthProvider`] backed by the secrets file, re-read on every request so
/// that an external refresher can rotate the token underneath us.
pub struct StoredTokenAuth {
    token_store: TokenStore,
}

impl StoredTokenAuth {
    pub fn new(token_store: TokenStore) -> Self {
        Self { token_store }
    }
}

#[async_trait]
impl AuthProvider for StoredTokenAuth {
    async fn auth_header(&self) -> Result<String> {
        let tokens = self
            .token_store
            .load_tokens()
            .context("Failed to load tokens")?;
        if tokens.is_expired() {
            return Err(anyhow!(
                "Access token in {} has expired",
                self.token_store.file_path().display()
            ));
        }
        debug!("Using stored access token");
        Ok(format!("Bearer {}", tokens.access_token))
    }
}
