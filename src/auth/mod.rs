//! Authorization for remote store requests
//!
//! Token acquisition and refresh happen outside this crate; providers here
//! only hand out an `Authorization` header for a token that already exists.

pub mod token_store;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Supplies the `Authorization` header for every store request.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn auth_header(&self) -> Result<String>;
}

/// Bearer token handed in directly (command line or environment).
pub struct StaticTokenAuth {
    access_token: String,
}

impl StaticTokenAuth {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(anyhow!("Access token is empty"));
        }
        Ok(Self { access_token })
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn auth_header(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.access_token))
    }
}
