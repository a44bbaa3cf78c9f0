use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use risk_engine::RiskAssessment;
use rust_decimal::prelude::ToPrimitive;

lazy_static! {
    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cortex_http_requests_total", "Total HTTP requests"),
        &["endpoint", "status"]
    ).expect("metric can be created");

    pub static ref INVALID_REQUESTS_TOTAL: IntCounter = IntCounter::new(
        "cortex_invalid_requests_total",
        "Requests rejected because the body was not a transaction"
    ).expect("metric can be created");

    // Business metrics - scoring outcomes
    pub static ref ASSESSMENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cortex_assessments_total", "Total risk assessments"),
        &["status"]
    ).expect("metric can be created");

    pub static ref RULE_TRIGGERS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cortex_rule_triggers_total", "Times each scoring rule fired"),
        &["rule"]
    ).expect("metric can be created");

    pub static ref RISK_SCORE: Histogram = Histogram::with_opts(
        HistogramOpts::new("cortex_risk_score", "Distribution of rounded risk scores")
            .buckets(vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0])
    ).expect("metric can be created");
}

/// Register all metrics with the given registry
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    registry.register(Box::new(INVALID_REQUESTS_TOTAL.clone()))?;
    registry.register(Box::new(ASSESSMENTS_TOTAL.clone()))?;
    registry.register(Box::new(RULE_TRIGGERS_TOTAL.clone()))?;
    registry.register(Box::new(RISK_SCORE.clone()))?;

    Ok(())
}

/// Record the outcome of one assessment
pub fn record_assessment(assessment: &RiskAssessment) {
    ASSESSMENTS_TOTAL
        .with_label_values(&[assessment.status.as_str()])
        .inc();

    for factor in &assessment.factors {
        RULE_TRIGGERS_TOTAL
            .with_label_values(&[factor.rule.as_str()])
            .inc();
    }

    RISK_SCORE.observe(assessment.score.to_f64().unwrap_or_default());
}

/// Generate metrics output in Prometheus text format
pub fn render(registry: &Registry) -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Metrics from the default registry
pub fn metrics_handler() -> Result<String, Box<dyn std::error::Error>> {
    render(prometheus::default_registry())
}
