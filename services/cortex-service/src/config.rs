use config::{ConfigError, Environment};
use risk_engine::RuleConfig;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub rules: RuleConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let rules = RuleConfig::default();

        let mut builder = config::Config::builder()
            // Server defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8088)?
            .set_default("server.workers", 4)?
            .set_default("server.max_body_bytes", 64 * 1024)?
            // Rate limiting
            .set_default("rate_limit.requests_per_minute", 600)?
            // Rule set, decimals kept as strings so they parse exactly
            .set_default("rules.amount_threshold", rules.amount_threshold.to_string())?
            .set_default("rules.high_amount_weight", rules.high_amount_weight.to_string())?
            .set_default("rules.gift_card_keyword", rules.gift_card_keyword.clone())?
            .set_default("rules.gift_card_threshold", rules.gift_card_threshold as i64)?
            .set_default("rules.gift_card_weight", rules.gift_card_weight.to_string())?
            .set_default("rules.unusual_hours_start", rules.unusual_hours_start as i64)?
            .set_default("rules.unusual_hours_end", rules.unusual_hours_end as i64)?
            .set_default("rules.unusual_hours_weight", rules.unusual_hours_weight.to_string())?
            .set_default("rules.city_mismatch_weight", rules.city_mismatch_weight.to_string())?
            .set_default("rules.max_score", rules.max_score.to_string())?
            .set_default("rules.review_threshold", rules.review_threshold.to_string())?
            .set_default("rules.medium_risk_threshold", rules.medium_risk_threshold.to_string())?;

        builder = builder.add_source(Environment::with_prefix("CORTEX").separator("__"));

        // Override from environment variables
        if let Ok(port) = env::var("SERVICE_PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;

        config
            .rules
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(config)
    }
}
