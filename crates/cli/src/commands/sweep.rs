//! `streamgate sweep`: Run one cache keepalive sweep.

use std::sync::Arc;
use streamgate_config::{AppConfig, StaticTenantStore};
use streamgate_keepalive::KeepaliveScheduler;

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let providers = streamgate_providers::build_from_config(&config)?;

    let scheduler = KeepaliveScheduler::new(
        Arc::new(StaticTenantStore::from_config(&config)),
        providers.renewer,
        config.keepalive.interval(),
        config.keepalive.cache_ttl(),
    );

    let Some(report) = scheduler.sweep().await else {
        return Err("a sweep is already running".into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Cache keepalive sweep");
    println!("=====================");
    println!("  Renewed: {}", report.renewed);
    println!("  Failed:  {}", report.failed);
    println!("  Skipped: {}", report.skipped);
    if let Some(reason) = &report.aborted {
        println!("\n  Sweep aborted: {reason}");
    }

    if report.failed > 0 || report.aborted.is_some() {
        return Err("keepalive sweep incomplete".into());
    }
    Ok(())
}
