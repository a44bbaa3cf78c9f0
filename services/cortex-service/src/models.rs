use risk_engine::RiskAssessment;
use rust_decimal::Decimal;
use serde::Serialize;

// ===== API Response =====
/// Assessment as returned over HTTP
///
/// The checkout clients read the score as `riskScore`, so it is emitted
/// next to `score`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CortexResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub risk_score: Decimal,
    #[serde(flatten)]
    pub assessment: RiskAssessment,
}

impl From<RiskAssessment> for CortexResponse {
    fn from(assessment: RiskAssessment) -> Self {
        CortexResponse {
            risk_score: assessment.score,
            assessment,
        }
    }
}

// ===== Health Check =====
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
