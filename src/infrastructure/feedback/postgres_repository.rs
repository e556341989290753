//! PostgreSQL feedback repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::domain::feedback::{AiFeedback, FeedbackPatch, FeedbackPoint, FeedbackRepository, FeedbackType};
use crate::domain::DomainError;

const SELECT_COLUMNS: &str = r#"
    SELECT id, attempt_id, feedback_type, overall_score, feedback_points,
           strengths, improvements, summary, created_at
    FROM ai_feedback
"#;

/// PostgreSQL implementation of FeedbackRepository
///
/// List-valued fields are stored as JSONB.
#[derive(Debug, Clone)]
pub struct PostgresFeedbackRepository {
    pool: PgPool,
}

impl PostgresFeedbackRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a small pool to `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Create the feedback table and its attempt index if missing
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ai_feedback (
                id UUID PRIMARY KEY,
                attempt_id UUID NOT NULL,
                feedback_type TEXT NOT NULL,
                overall_score SMALLINT NOT NULL,
                feedback_points JSONB NOT NULL,
                strengths JSONB NOT NULL,
                improvements JSONB NOT NULL,
                summary TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create feedback table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_ai_feedback_attempt ON ai_feedback (attempt_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create feedback index: {}", e)))?;

        info!("Feedback table ready");
        Ok(())
    }
}

#[async_trait]
impl FeedbackRepository for PostgresFeedbackRepository {
    async fn save(&self, feedback: AiFeedback) -> Result<AiFeedback, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO ai_feedback (id, attempt_id, feedback_type, overall_score, feedback_points,
                                     strengths, improvements, summary, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(feedback.id())
        .bind(feedback.attempt_id())
        .bind(feedback.feedback_type().as_str())
        .bind(i16::from(feedback.overall_score()))
        .bind(Json(feedback.feedback_points()))
        .bind(Json(feedback.strengths()))
        .bind(Json(feedback.improvements()))
        .bind(feedback.summary())
        .bind(feedback.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to save feedback: {}", e)))?;

        Ok(feedback)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AiFeedback>, DomainError> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get feedback: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_feedback(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_attempt(&self, attempt_id: Uuid) -> Result<Vec<AiFeedback>, DomainError> {
        let rows = sqlx::query(&format!(
            "{} WHERE attempt_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list feedback: {}", e)))?;

        rows.iter().map(row_to_feedback).collect()
    }

    async fn update(&self, id: Uuid, patch: &FeedbackPatch) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        let row = sqlx::query(&format!("{} WHERE id = $1 FOR UPDATE", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get feedback: {}", e)))?;

        let mut feedback = match row {
            Some(row) => row_to_feedback(&row)?,
            None => return Err(DomainError::not_found(format!("Feedback '{}' not found", id))),
        };

        feedback.apply_patch(patch);

        sqlx::query(
            r#"
            UPDATE ai_feedback
            SET overall_score = $2, feedback_points = $3, strengths = $4,
                improvements = $5, summary = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(i16::from(feedback.overall_score()))
        .bind(Json(feedback.feedback_points()))
        .bind(Json(feedback.strengths()))
        .bind(Json(feedback.improvements()))
        .bind(feedback.summary())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update feedback: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit feedback update: {}", e)))
    }
}

fn row_to_feedback(row: &PgRow) -> Result<AiFeedback, DomainError> {
    let id: Uuid = row.get("id");
    let attempt_id: Uuid = row.get("attempt_id");
    let feedback_type: String = row.get("feedback_type");
    let overall_score: i16 = row.get("overall_score");
    let Json(feedback_points): Json<Vec<FeedbackPoint>> = row
        .try_get("feedback_points")
        .map_err(|e| DomainError::storage(format!("Invalid feedback points in database: {}", e)))?;
    let Json(strengths): Json<Vec<String>> = row
        .try_get("strengths")
        .map_err(|e| DomainError::storage(format!("Invalid strengths in database: {}", e)))?;
    let Json(improvements): Json<Vec<String>> = row
        .try_get("improvements")
        .map_err(|e| DomainError::storage(format!("Invalid improvements in database: {}", e)))?;
    let summary: String = row.get("summary");
    let created_at: DateTime<Utc> = row.get("created_at");

    let feedback_type = FeedbackType::parse(&feedback_type)
        .map_err(|e| DomainError::storage(format!("Invalid feedback type in database: {}", e)))?;
    let overall_score = u8::try_from(overall_score)
        .map_err(|_| DomainError::storage(format!("Invalid score in database: {}", overall_score)))?;

    Ok(AiFeedback::restore(
        id,
        attempt_id,
        feedback_type,
        overall_score,
        feedback_points,
        strengths,
        improvements,
        summary,
        created_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feedback::{FeedbackEvaluation, Severity};

    // Requires a running PostgreSQL; set DATABASE_URL to run.
    async fn repository() -> PostgresFeedbackRepository {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/drill_feedback_test".to_string());
        let repo = PostgresFeedbackRepository::connect(&url, 2).await.unwrap();
        repo.migrate().await.unwrap();
        repo
    }

    fn sample(attempt_id: Uuid) -> AiFeedback {
        let evaluation = FeedbackEvaluation {
            overall_score: 81.0,
            strengths: vec!["Clear hypothesis".to_string()],
            improvements: vec!["Quantify impact".to_string()],
            feedback_points: vec![FeedbackPoint::new(
                "structure",
                Severity::Important,
                "Buckets overlap",
                "Use a MECE split",
            )],
        };
        AiFeedback::new(attempt_id, FeedbackType::Drill, evaluation, "Solid attempt")
    }

    #[tokio::test]
    #[ignore]
    async fn test_save_find_and_update() {
        let repo = repository().await;
        let saved = repo.save(sample(Uuid::new_v4())).await.unwrap();

        let found = repo.find_by_id(saved.id()).await.unwrap().unwrap();
        assert_eq!(found.summary(), "Solid attempt");
        assert_eq!(found.feedback_points().len(), 1);

        let patch = FeedbackPatch {
            overall_score: Some(90),
            ..Default::default()
        };
        repo.update(saved.id(), &patch).await.unwrap();

        let updated = repo.find_by_id(saved.id()).await.unwrap().unwrap();
        assert_eq!(updated.overall_score(), 90);
    }

    #[tokio::test]
    #[ignore]
    async fn test_update_missing_is_not_found() {
        let repo = repository().await;
        let patch = FeedbackPatch {
            summary: Some("x".to_string()),
            ..Default::default()
        };

        let err = repo.update(Uuid::new_v4(), &patch).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
