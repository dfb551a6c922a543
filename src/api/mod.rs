pub mod handlers;
pub mod models;
pub mod routes;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub use routes::create_router;

use crate::error::VacuumError;
use models::ErrorResponse;

impl IntoResponse for VacuumError {
    fn into_response(self) -> Response {
        let status = match &self {
            VacuumError::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
            VacuumError::NoResponse(_) => StatusCode::GATEWAY_TIMEOUT,
            VacuumError::SessionRunning => StatusCode::CONFLICT,
            VacuumError::Protocol(_) | VacuumError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
