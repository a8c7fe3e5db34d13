//! `streamgate tenants`: List configured tenants.

use serde_json::json;
use streamgate_config::{AppConfig, StaticTenantStore};
use streamgate_core::{TenantProviderConfig, TenantStore};

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let tenants = StaticTenantStore::from_config(&config).list().await?;

    if json {
        let rows: Vec<_> = tenants.iter().map(tenant_json).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if tenants.is_empty() {
        println!("No tenants configured: add [[tenants]] to {}", config_path_hint());
        return Ok(());
    }

    println!("Configured tenants ({})", tenants.len());
    println!("======================");
    for tenant in &tenants {
        println!();
        println!("  {}", tenant.tenant_id);
        println!("    Provider:  {}", tenant.provider);
        println!("    Model:     {}", tenant.params.adapter_id);
        println!("    API key:   {}", redact(&tenant.api_key));
        if let Some(url) = &tenant.api_url {
            println!("    API URL:   {url}");
        }
        if let Some(cache_id) = tenant.renewable_cache_id() {
            println!("    Cache:     {cache_id}");
        }
    }

    Ok(())
}

fn tenant_json(tenant: &TenantProviderConfig) -> serde_json::Value {
    json!({
        "tenant_id": tenant.tenant_id,
        "provider": tenant.provider,
        "adapter_id": tenant.params.adapter_id,
        "api_key": redact(&tenant.api_key),
        "api_url": tenant.api_url,
        "cache_id": tenant.renewable_cache_id(),
    })
}

fn config_path_hint() -> String {
    std::env::var("STREAMGATE_CONFIG")
        .unwrap_or_else(|_| AppConfig::config_dir().join("config.toml").display().to_string())
}

/// Keep the last four characters of long keys, hide short ones entirely.
fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".into();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
