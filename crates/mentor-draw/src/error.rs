use crate::config::ConfigError;
use crate::draw::{DrawError, GatewayError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Roster(csv::Error),
    Store(GatewayError),
    Draw(DrawError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Roster(err) => write!(f, "invalid roster CSV: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Draw(err) => write!(f, "draw error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Roster(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Draw(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Draw(err) => draw_status(err),
            AppError::Store(err) => gateway_status(err),
            AppError::Roster(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True when a draw stopped after writing part of a generation.
    pub fn is_partial(&self) -> bool {
        matches!(self, AppError::Draw(err) if err.is_partial())
    }
}

fn draw_status(err: &DrawError) -> StatusCode {
    match err {
        DrawError::CapacityMismatch(_)
        | DrawError::NoMentors
        | DrawError::TooManyMentors { .. }
        | DrawError::DuplicateMentor(_)
        | DrawError::Intake(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DrawError::EngagedCoupleNotFound { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        DrawError::Store { source, .. } | DrawError::Gateway(source) => gateway_status(source),
    }
}

fn gateway_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::ConstraintViolation(_) => StatusCode::CONFLICT,
        GatewayError::NotFound => StatusCode::NOT_FOUND,
        GatewayError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "partial": self.is_partial(),
        }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Roster(value)
    }
}

impl From<GatewayError> for AppError {
    fn from(value: GatewayError) -> Self {
        Self::Store(value)
    }
}

impl From<DrawError> for AppError {
    fn from(value: DrawError) -> Self {
        Self::Draw(value)
    }
}
