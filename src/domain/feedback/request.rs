//! Incoming generation requests and their validation

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FeedbackType;
use crate::domain::DomainError;

const MAX_CONTENT_LENGTH: usize = 20_000;
const MAX_METRICS: usize = 50;
const MAX_METRIC_NAME_LENGTH: usize = 100;

/// Generation request as received from callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeedbackRequest {
    pub attempt_id: String,
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    pub response: AttemptResponse,
}

/// The user's submission for an attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttemptResponse {
    pub content: String,
    #[serde(default)]
    pub metrics: Vec<ResponseMetric>,
}

/// A named numeric measurement attached to a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseMetric {
    pub name: String,
    pub value: f64,
}

impl ResponseMetric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A request that passed validation; the only input the pipeline accepts
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFeedbackRequest {
    pub attempt_id: Uuid,
    pub feedback_type: FeedbackType,
    pub content: String,
    pub metrics: Vec<ResponseMetric>,
}

impl FeedbackRequest {
    pub fn new(
        attempt_id: impl Into<String>,
        feedback_type: FeedbackType,
        content: impl Into<String>,
        metrics: Vec<ResponseMetric>,
    ) -> Self {
        Self {
            attempt_id: attempt_id.into(),
            feedback_type,
            response: AttemptResponse {
                content: content.into(),
                metrics,
            },
        }
    }

    pub fn validate(&self) -> Result<ValidatedFeedbackRequest, DomainError> {
        let attempt_id = parse_uuid("attemptId", &self.attempt_id)?;
        let content = self.response.content.trim();

        if content.is_empty() {
            return Err(DomainError::validation("response.content cannot be empty"));
        }

        if content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(DomainError::validation(format!(
                "response.content exceeds maximum length of {} characters",
                MAX_CONTENT_LENGTH
            )));
        }

        if self.response.metrics.len() > MAX_METRICS {
            return Err(DomainError::validation(format!(
                "response.metrics cannot contain more than {} entries",
                MAX_METRICS
            )));
        }

        for (index, metric) in self.response.metrics.iter().enumerate() {
            validate_metric(index, metric)?;
        }

        Ok(ValidatedFeedbackRequest {
            attempt_id,
            feedback_type: self.feedback_type,
            content: content.to_string(),
            metrics: self.response.metrics.clone(),
        })
    }
}

fn validate_metric(index: usize, metric: &ResponseMetric) -> Result<(), DomainError> {
    let name = metric.name.trim();

    if name.is_empty() {
        return Err(DomainError::validation(format!(
            "response.metrics[{}].name cannot be empty",
            index
        )));
    }

    if name.len() > MAX_METRIC_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "response.metrics[{}].name exceeds maximum length of {} characters",
            index, MAX_METRIC_NAME_LENGTH
        )));
    }

    if !metric.value.is_finite() {
        return Err(DomainError::validation(format!(
            "response.metrics[{}].value must be a finite number",
            index
        )));
    }

    Ok(())
}

/// Parses a UUID-valued identifier, naming the field on failure
pub fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| DomainError::validation(format!("{} must be a valid UUID, got '{}'", field, value)))
}
