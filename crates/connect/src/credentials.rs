//! Credential provider seam.
//!
//! OAuth/API-key acquisition and refresh is owned elsewhere; adapters only
//! need an opaque, currently-valid bearer token on demand.

use async_trait::async_trait;

use crate::adapters::AdapterError;
use clearway_core::connections::Connection;

/// Produces a valid bearer credential for a connection on demand.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns an opaque bearer token, refreshing behind the scenes if
    /// needed. Fails with an auth error when the credential is invalid
    /// beyond refresh.
    async fn bearer_token(&self, connection: &Connection) -> Result<String, AdapterError>;
}

/// Fixed-token provider for tests and single-tenant deployments.
pub struct StaticCredentialProvider {
    token: String,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn bearer_token(&self, _connection: &Connection) -> Result<String, AdapterError> {
        Ok(self.token.clone())
    }
}
