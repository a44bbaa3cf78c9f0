use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use cortex_service::{
    config::Config,
    handlers::{self, Uptime},
    metrics,
    middleware::RateLimiter,
};
use dotenv::dotenv;
use risk_engine::RiskEngine;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cortex_service=info,actix_web=info")),
        )
        .json()
        .init();

    info!("Starting Cortex risk service...");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    metrics::register_metrics(prometheus::default_registry())
        .context("Failed to register metrics")?;

    // Initialize components
    let engine = Arc::new(RiskEngine::with_config(config.rules.clone())?);
    let rate_limiter = RateLimiter::new(config.rate_limit.requests_per_minute);
    let uptime = Uptime::start();

    info!(
        "Risk engine initialized (review threshold {}, {} requests/min)",
        engine.config().review_threshold,
        config.rate_limit.requests_per_minute
    );

    let server_config = config.server.clone();

    info!(
        "Starting HTTP server on {}:{}",
        server_config.host, server_config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(engine.clone()))
            .app_data(web::Data::new(uptime))
            .app_data(web::PayloadConfig::new(server_config.max_body_bytes))
            .wrap(rate_limiter.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))
    .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?
    .run()
    .await?;

    Ok(())
}
