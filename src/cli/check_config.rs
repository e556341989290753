//! Check-config command - loads configuration and prints it

use crate::config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    config.cache.ttl_by_category()?;
    config.retry.policy()?;

    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}
