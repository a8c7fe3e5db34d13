//! Static tenant store backed by the `[[tenants]]` section of the config file.

use async_trait::async_trait;
use std::collections::HashMap;

use streamgate_core::error::StoreError;
use streamgate_core::{TenantProviderConfig, TenantStore};

/// Read-only [`TenantStore`] over a fixed set of tenant records.
pub struct StaticTenantStore {
    tenants: HashMap<String, TenantProviderConfig>,
}

impl StaticTenantStore {
    pub fn new(tenants: impl IntoIterator<Item = TenantProviderConfig>) -> Self {
        Self {
            tenants: tenants
                .into_iter()
                .map(|t| (t.tenant_id.clone(), t))
                .collect(),
        }
    }

    pub fn from_config(config: &crate::AppConfig) -> Self {
        Self::new(config.tenants.iter().cloned())
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[async_trait]
impl TenantStore for StaticTenantStore {
    async fn get(&self, tenant_id: &str) -> Result<Option<TenantProviderConfig>, StoreError> {
        Ok(self.tenants.get(tenant_id).cloned())
    }

    async fn list(&self) -> Result<Vec<TenantProviderConfig>, StoreError> {
        let mut all: Vec<_> = self.tenants.values().cloned().collect();
        all.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        Ok(all)
    }
}
