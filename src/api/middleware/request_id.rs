//! Request id propagation

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_http::request_id::RequestId as TowerRequestId;
use uuid::Uuid;

use crate::api::types::ApiError;
use crate::domain::DomainError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Id of the current request
///
/// Taken from the id set by `SetRequestIdLayer`, then the raw header, and
/// generated when neither is present.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts a domain error into an API error tagged with this id
    pub fn error(&self, err: DomainError) -> ApiError {
        ApiError::from(err).with_request_id(self.0.clone())
    }
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_layer = parts
            .extensions
            .get::<TowerRequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .map(str::to_string);

        let id = from_layer
            .or_else(|| {
                parts
                    .headers
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(RequestId(id))
    }
}
