//! Feedback entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;
use crate::domain::llm::StructuredCompletion;

pub const MAX_SCORE: u8 = 100;

/// Kind of attempt being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackType {
    Drill,
    Simulation,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drill => "DRILL",
            Self::Simulation => "SIMULATION",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "DRILL" => Ok(Self::Drill),
            "SIMULATION" => Ok(Self::Simulation),
            other => Err(DomainError::validation(format!(
                "Unknown feedback type '{}'",
                other
            ))),
        }
    }
}

/// Urgency of a feedback point
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[serde(alias = "critical")]
    Critical,
    #[serde(alias = "important")]
    Important,
    #[serde(alias = "suggestion")]
    Suggestion,
}

/// One categorized critique within a feedback record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPoint {
    pub category: String,
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
}

impl FeedbackPoint {
    pub fn new(
        category: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            severity,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Structured result of the evaluation completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvaluation {
    #[serde(alias = "overall_score")]
    pub overall_score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default, alias = "feedback_points")]
    pub feedback_points: Vec<FeedbackPoint>,
}

impl FeedbackEvaluation {
    /// Score rounded onto the 0-100 scale
    pub fn score(&self) -> u8 {
        self.overall_score.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
    }
}

impl StructuredCompletion for FeedbackEvaluation {
    fn check(&self) -> Result<(), String> {
        if !self.overall_score.is_finite()
            || self.overall_score < 0.0
            || self.overall_score > f64::from(MAX_SCORE)
        {
            return Err(format!(
                "overallScore {} is outside 0-{}",
                self.overall_score, MAX_SCORE
            ));
        }

        if let Some(point) = self
            .feedback_points
            .iter()
            .find(|p| p.message.trim().is_empty())
        {
            return Err(format!(
                "feedback point in category '{}' has an empty message",
                point.category
            ));
        }

        Ok(())
    }
}

/// AI-generated evaluation of one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiFeedback {
    id: Uuid,
    attempt_id: Uuid,
    #[serde(rename = "type")]
    feedback_type: FeedbackType,
    overall_score: u8,
    feedback_points: Vec<FeedbackPoint>,
    strengths: Vec<String>,
    improvements: Vec<String>,
    summary: String,
    created_at: DateTime<Utc>,
}

impl AiFeedback {
    /// Builds a new record from a completed evaluation and narrative
    pub fn new(
        attempt_id: Uuid,
        feedback_type: FeedbackType,
        evaluation: FeedbackEvaluation,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt_id,
            feedback_type,
            overall_score: evaluation.score(),
            feedback_points: evaluation.feedback_points,
            strengths: evaluation.strengths,
            improvements: evaluation.improvements,
            summary: summary.into(),
            created_at: Utc::now(),
        }
    }

    /// Rebuilds a record from persisted columns
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        attempt_id: Uuid,
        feedback_type: FeedbackType,
        overall_score: u8,
        feedback_points: Vec<FeedbackPoint>,
        strengths: Vec<String>,
        improvements: Vec<String>,
        summary: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            attempt_id,
            feedback_type,
            overall_score,
            feedback_points,
            strengths,
            improvements,
            summary,
            created_at,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn feedback_type(&self) -> FeedbackType {
        self.feedback_type
    }

    pub fn overall_score(&self) -> u8 {
        self.overall_score
    }

    pub fn feedback_points(&self) -> &[FeedbackPoint] {
        &self.feedback_points
    }

    pub fn strengths(&self) -> &[String] {
        &self.strengths
    }

    pub fn improvements(&self) -> &[String] {
        &self.improvements
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Applies a validated patch in place
    pub fn apply_patch(&mut self, patch: &FeedbackPatch) {
        if let Some(score) = patch.overall_score {
            self.overall_score = score;
        }

        if let Some(summary) = &patch.summary {
            self.summary = summary.clone();
        }

        if let Some(strengths) = &patch.strengths {
            self.strengths = strengths.clone();
        }

        if let Some(improvements) = &patch.improvements {
            self.improvements = improvements.clone();
        }

        if let Some(points) = &patch.feedback_points {
            self.feedback_points = points.clone();
        }
    }
}

/// Partial update of a feedback record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeedbackPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strengths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_points: Option<Vec<FeedbackPoint>>,
}

impl FeedbackPatch {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.overall_score.is_none()
            && self.summary.is_none()
            && self.strengths.is_none()
            && self.improvements.is_none()
            && self.feedback_points.is_none()
        {
            return Err(DomainError::validation(
                "Patch must change at least one field",
            ));
        }

        if let Some(score) = self.overall_score {
            if score > MAX_SCORE {
                return Err(DomainError::validation(format!(
                    "overallScore must be between 0 and {}",
                    MAX_SCORE
                )));
            }
        }

        if let Some(summary) = &self.summary {
            if summary.trim().is_empty() {
                return Err(DomainError::validation("summary cannot be empty"));
            }
        }

        Ok(())
    }
}
