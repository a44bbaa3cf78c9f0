use crate::errors::{CortexError, CortexResult};
use crate::metrics;
use crate::models::*;
use actix_web::{web, HttpResponse, ResponseError};
use risk_engine::{RiskEngine, TransactionInput};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Process start, reported by the health check
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    started_at: Instant,
}

impl Uptime {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    pub fn seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

// ===== Health Check =====
pub async fn health_check(uptime: web::Data<Uptime>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.seconds(),
    })
}

// ===== Evaluate Transaction =====
pub async fn evaluate_transaction(
    body: web::Bytes,
    engine: web::Data<Arc<RiskEngine>>,
) -> CortexResult<HttpResponse> {
    let result = TransactionInput::from_slice(&body)
        .map_err(CortexError::from)
        .map(|tx| HttpResponse::Ok().json(assess(&engine, &tx)));

    record_request("evaluate", &result);
    result
}

// ===== Evaluate Batch =====
pub async fn evaluate_batch(
    body: web::Bytes,
    engine: web::Data<Arc<RiskEngine>>,
) -> CortexResult<HttpResponse> {
    let result = parse_batch(&body).map(|transactions| {
        let responses: Vec<CortexResponse> = transactions
            .iter()
            .map(|tx| assess(&engine, tx))
            .collect();

        info!("Batch of {} transactions evaluated", responses.len());
        HttpResponse::Ok().json(responses)
    });

    record_request("batch", &result);
    result
}

/// Every entry must be a transaction object, otherwise the whole batch is rejected
fn parse_batch(body: &[u8]) -> CortexResult<Vec<TransactionInput>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| CortexError::InvalidBatch(format!("malformed JSON: {}", e)))?;

    let Value::Array(entries) = value else {
        return Err(CortexError::InvalidBatch("expected a JSON array".to_string()));
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            TransactionInput::from_json_value(entry)
                .map_err(|e| CortexError::InvalidBatch(format!("entry {}: {}", index, e)))
        })
        .collect()
}

fn assess(engine: &RiskEngine, tx: &TransactionInput) -> CortexResponse {
    let assessment = engine.evaluate(tx);
    metrics::record_assessment(&assessment);

    if assessment.is_flagged() {
        warn!(
            "Transaction {} flagged for review: score {} ({} rules triggered)",
            assessment.transaction_id,
            assessment.score,
            assessment.factors.len()
        );
    } else {
        info!(
            "Transaction {} approved: score {}",
            assessment.transaction_id, assessment.score
        );
    }

    CortexResponse::from(assessment)
}

// ===== Prometheus Metrics =====
pub async fn metrics_endpoint() -> CortexResult<HttpResponse> {
    let result = metrics::metrics_handler()
        .map_err(|e| CortexError::InternalError(e.to_string()))
        .map(|body| {
            HttpResponse::Ok()
                .content_type("text/plain; version=0.0.4")
                .body(body)
        });

    record_request("metrics", &result);
    result
}

fn record_request(endpoint: &str, result: &CortexResult<HttpResponse>) {
    let status = match result {
        Ok(response) => response.status(),
        Err(err) => {
            if err.status_code().is_client_error() {
                debug!("Rejected {} request: {}", endpoint, err);
                metrics::INVALID_REQUESTS_TOTAL.inc();
            } else {
                error!("Error in {} handler: {}", endpoint, err);
            }
            err.status_code()
        }
    };

    metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[endpoint, status.as_str()])
        .inc();
}

// ===== Configure Routes =====
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/cortex")
            .route("/evaluate", web::post().to(evaluate_transaction))
            .route("/batch", web::post().to(evaluate_batch)),
    )
    .route("/api/cortex", web::post().to(evaluate_transaction))
    .route("/health", web::get().to(health_check))
    .route("/metrics", web::get().to(metrics_endpoint));
}
