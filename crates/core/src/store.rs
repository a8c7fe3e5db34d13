//! The configuration store seam.
//!
//! The gateway never writes tenant configuration; it reads one record per
//! request and the keepalive scheduler enumerates all of them once per sweep.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::provider::TenantProviderConfig;

#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Fetch one tenant's provider configuration. `Ok(None)` means unknown tenant.
    async fn get(&self, tenant_id: &str) -> Result<Option<TenantProviderConfig>, StoreError>;

    /// Every tenant configuration currently known.
    async fn list(&self) -> Result<Vec<TenantProviderConfig>, StoreError>;
}
