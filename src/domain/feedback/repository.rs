//! Feedback repository trait

use async_trait::async_trait;
use uuid::Uuid;

use super::{AiFeedback, FeedbackPatch};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Durable store for feedback records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Persists a new record
    async fn save(&self, feedback: AiFeedback) -> Result<AiFeedback, DomainError>;

    /// Finds a record by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AiFeedback>, DomainError>;

    /// Finds every record generated for an attempt
    async fn find_by_attempt(&self, attempt_id: Uuid) -> Result<Vec<AiFeedback>, DomainError>;

    /// Applies a patch to an existing record
    async fn update(&self, id: Uuid, patch: &FeedbackPatch) -> Result<(), DomainError>;
}

/// In-memory implementation of FeedbackRepository
pub mod in_memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::RwLock;

    /// In-memory implementation for development and tests
    #[derive(Debug, Default)]
    pub struct InMemoryFeedbackRepository {
        records: RwLock<HashMap<Uuid, AiFeedback>>,
        lookups: AtomicUsize,
    }

    impl InMemoryFeedbackRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of `find_by_id` calls served so far
        pub fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }

        pub async fn len(&self) -> usize {
            self.records.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.records.read().await.is_empty()
        }
    }

    #[async_trait]
    impl FeedbackRepository for InMemoryFeedbackRepository {
        async fn save(&self, feedback: AiFeedback) -> Result<AiFeedback, DomainError> {
            let mut records = self.records.write().await;

            if records.contains_key(&feedback.id()) {
                return Err(DomainError::storage(format!(
                    "Feedback '{}' already exists",
                    feedback.id()
                )));
            }

            records.insert(feedback.id(), feedback.clone());
            Ok(feedback)
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<AiFeedback>, DomainError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.read().await.get(&id).cloned())
        }

        async fn find_by_attempt(&self, attempt_id: Uuid) -> Result<Vec<AiFeedback>, DomainError> {
            let mut matching: Vec<AiFeedback> = self
                .records
                .read()
                .await
                .values()
                .filter(|f| f.attempt_id() == attempt_id)
                .cloned()
                .collect();

            matching.sort_by_key(|f| std::cmp::Reverse(f.created_at()));
            Ok(matching)
        }

        async fn update(&self, id: Uuid, patch: &FeedbackPatch) -> Result<(), DomainError> {
            let mut records = self.records.write().await;

            let record = records
                .get_mut(&id)
                .ok_or_else(|| DomainError::not_found(format!("Feedback '{}' not found", id)))?;

            record.apply_patch(patch);
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::domain::feedback::{FeedbackEvaluation, FeedbackType};
        use chrono::{Duration, Utc};

        fn feedback_for(attempt_id: Uuid) -> AiFeedback {
            let evaluation = FeedbackEvaluation {
                overall_score: 60.0,
                strengths: vec![],
                improvements: vec![],
                feedback_points: vec![],
            };
            AiFeedback::new(attempt_id, FeedbackType::Drill, evaluation, "ok")
        }

        #[tokio::test]
        async fn test_save_and_find() {
            let repo = InMemoryFeedbackRepository::new();
            let feedback = feedback_for(Uuid::new_v4());

            repo.save(feedback.clone()).await.unwrap();

            assert_eq!(repo.find_by_id(feedback.id()).await.unwrap(), Some(feedback));
            assert_eq!(repo.lookups(), 1);
        }

        #[tokio::test]
        async fn test_duplicate_save_fails() {
            let repo = InMemoryFeedbackRepository::new();
            let feedback = feedback_for(Uuid::new_v4());

            repo.save(feedback.clone()).await.unwrap();
            assert!(repo.save(feedback).await.is_err());
        }

        #[tokio::test]
        async fn test_find_by_attempt_newest_first() {
            let repo = InMemoryFeedbackRepository::new();
            let attempt_id = Uuid::new_v4();
            let now = Utc::now();

            let older = feedback_for(attempt_id).with_created_at(now - Duration::minutes(5));
            let newer = feedback_for(attempt_id).with_created_at(now);
            repo.save(older.clone()).await.unwrap();
            repo.save(newer.clone()).await.unwrap();
            repo.save(feedback_for(Uuid::new_v4())).await.unwrap();

            let found = repo.find_by_attempt(attempt_id).await.unwrap();
            assert_eq!(found, vec![newer, older]);
        }

        #[tokio::test]
        async fn test_update_missing_is_not_found() {
            let repo = InMemoryFeedbackRepository::new();
            let patch = FeedbackPatch {
                overall_score: Some(10),
                ..Default::default()
            };

            let result = repo.update(Uuid::new_v4(), &patch).await;
            assert!(matches!(result, Err(DomainError::NotFound { .. })));
        }
    }
}
