//! `streamgate serve`: Start the HTTP streaming gateway.

use streamgate_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Streamgate Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Tenants:   {}", config.tenants.len());
    println!(
        "   Keepalive: {}",
        if config.keepalive.enabled {
            format!(
                "every {} min (TTL {} min)",
                config.keepalive.interval_minutes, config.keepalive.cache_ttl_minutes
            )
        } else {
            "disabled".to_string()
        }
    );

    streamgate_gateway::start(config).await?;

    Ok(())
}
