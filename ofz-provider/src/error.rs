//! Maps [`ofz_oracle::OracleError`] and handler-local failures onto the
//! `{"error": "<message>"}` / status-code shape spec §7 requires.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use ofz_oracle::OracleError;
use serde_json::json;

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<OracleError> for AppError {
    fn from(err: OracleError) -> Self {
        let status = match &err {
            OracleError::Config(_) | OracleError::ContractMissing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            OracleError::Upstream { .. } | OracleError::ChainRpc(_) => StatusCode::BAD_GATEWAY,
            OracleError::CacheCorruption(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OracleError::SignatureExpired { .. } => StatusCode::BAD_REQUEST,
            OracleError::TxReverted { .. } | OracleError::TxTimeout(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log::error!("{} - {}", self.status, self.message);
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
