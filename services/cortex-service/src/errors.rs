use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

pub const TRANSACTION_REQUIRED: &str = "Transaction data is required.";
pub const BATCH_REQUIRED: &str = "A JSON array of transactions is required.";
pub const INTERNAL_ERROR: &str = "An internal error occurred.";

#[derive(Debug)]
pub enum CortexError {
    InvalidTransaction(String),
    InvalidBatch(String),
    ConfigurationError(String),
    InternalError(String),
}

impl fmt::Display for CortexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CortexError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {}", msg),
            CortexError::InvalidBatch(msg) => write!(f, "Invalid batch: {}", msg),
            CortexError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            CortexError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for CortexError {}

// Details stay in the logs, callers only get the fixed message
impl ResponseError for CortexError {
    fn status_code(&self) -> StatusCode {
        match self {
            CortexError::InvalidTransaction(_) | CortexError::InvalidBatch(_) => {
                StatusCode::BAD_REQUEST
            }
            CortexError::ConfigurationError(_) | CortexError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            CortexError::InvalidTransaction(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": TRANSACTION_REQUIRED
                }))
            }
            CortexError::InvalidBatch(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": BATCH_REQUIRED
            })),
            CortexError::ConfigurationError(_) | CortexError::InternalError(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": INTERNAL_ERROR
                }))
            }
        }
    }
}

impl From<risk_engine::Error> for CortexError {
    fn from(err: risk_engine::Error) -> Self {
        match err {
            risk_engine::Error::InvalidInput(msg) => CortexError::InvalidTransaction(msg),
            risk_engine::Error::InvalidConfig(msg) => CortexError::ConfigurationError(msg),
        }
    }
}

pub type CortexResult<T> = Result<T, CortexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let invalid = CortexError::from(risk_engine::Error::InvalidInput("null".to_string()));
        assert_eq!(invalid.error_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let batch = CortexError::InvalidBatch("not an array".to_string());
        assert_eq!(batch.error_response().status(), StatusCode::BAD_REQUEST);

        let internal = CortexError::InternalError("boom".to_string());
        assert_eq!(internal.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let config = CortexError::from(risk_engine::Error::InvalidConfig("bad".to_string()));
        assert_eq!(config.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
