//! Error envelope returned by every endpoint

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    ValidationError,
    NotFound,
    UpstreamUnavailable,
    CacheUnavailable,
    ConfigurationError,
    SerializationError,
    StorageError,
    InternalError,
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidationError => write!(f, "VALIDATION_ERROR"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::UpstreamUnavailable => write!(f, "UPSTREAM_UNAVAILABLE"),
            Self::CacheUnavailable => write!(f, "CACHE_UNAVAILABLE"),
            Self::ConfigurationError => write!(f, "CONFIGURATION_ERROR"),
            Self::SerializationError => write!(f, "SERIALIZATION_ERROR"),
            Self::StorageError => write!(f, "STORAGE_ERROR"),
            Self::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// `{ code, message, details, timestamp, requestId }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub code: ApiErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                code,
                message: message.into(),
                details: None,
                timestamp: Utc::now(),
                request_id: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.response.details = Some(details);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.response.request_id = Some(request_id.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorCode::ValidationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiErrorCode::InternalError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } => Self::bad_request(message),
            DomainError::NotFound { message } => Self::not_found(message),
            DomainError::Transient { origin, message } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorCode::UpstreamUnavailable,
                message,
            )
            .with_details(serde_json::json!({ "origin": origin })),
            DomainError::Connection { message } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorCode::CacheUnavailable,
                message,
            ),
            DomainError::Configuration { message } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorCode::ConfigurationError,
                message,
            ),
            DomainError::Serialization { message } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorCode::SerializationError,
                message,
            ),
            DomainError::Storage { message } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorCode::StorageError,
                message,
            ),
            DomainError::Internal { message } => Self::internal(message),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.response.code, self.response.message)
    }
}

impl std::error::Error for ApiError {}
