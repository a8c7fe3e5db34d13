//! `streamgate init`: Print or write a default configuration.

use streamgate_config::AppConfig;

const EXAMPLE_TENANTS: &str = r#"
# Tenants are served by the built-in static store.
#
# [[tenants]]
# tenant_id = "acme"
# provider = "completion"
# api_key = "sk-..."
# base_prompt = "You are Acme's sales expert. Answer in JSON with \"answer\" and \"questions\". "
# [tenants.params]
# adapter_id = "acme/sales-lora"
# max_tokens = 512
#
# [[tenants]]
# tenant_id = "globex"
# provider = "chat"
# api_key = "..."
# base_prompt = "You are Globex's assistant."
# [tenants.params]
# adapter_id = "gemini-1.5-flash"
# cache_id = "cachedContents/globex"
"#;

/// Default config plus commented tenant examples.
pub fn template() -> String {
    format!("{}{EXAMPLE_TENANTS}", AppConfig::default_toml())
}

pub async fn run(write: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !write {
        print!("{}", template());
        return Ok(());
    }

    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("  Config file exists: {} (left untouched)", config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, template())?;
    println!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_as_default_config() {
        let config: AppConfig = toml::from_str(&template()).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.tenants.is_empty());
        assert_eq!(config.gateway.port, 8787);
    }
}
