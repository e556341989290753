//! Feedback generation and retrieval service

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::prompts;
use crate::domain::feedback::{
    parse_uuid, AiFeedback, FeedbackEvaluation, FeedbackPatch, FeedbackRepository,
    FeedbackRequest, GenerationStage, ValidatedFeedbackRequest,
};
use crate::domain::{CacheCategory, DomainError};
use crate::infrastructure::cache::CacheStore;
use crate::infrastructure::llm::{ResilientClient, SendOptions};

/// Default age after which a cached record is reloaded from the repository
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(300);

/// Number of lock stripes guarding per-record cache refills
const RECORD_LOCK_STRIPES: usize = 64;

type SharedGeneration = Shared<BoxFuture<'static, Result<AiFeedback, DomainError>>>;

fn cache_key(feedback_id: Uuid) -> String {
    format!("feedback:{}", feedback_id)
}

/// Cached copy of a record and when it was cached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedFeedback {
    feedback: AiFeedback,
    cached_at: DateTime<Utc>,
}

/// Striped locks serializing cache refills against updates of the same record
///
/// A reader that misses the cache holds the record's lock across the
/// repository read and the cache write, and `update` holds it across the
/// repository write and the invalidation. A stale read can therefore never be
/// cached after the invalidation that should have removed it.
struct RecordLocks {
    stripes: Vec<Mutex<()>>,
}

impl RecordLocks {
    fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    async fn lock(&self, id: Uuid) -> MutexGuard<'_, ()> {
        let index = (id.as_u128() % self.stripes.len() as u128) as usize;
        self.stripes[index].lock().await
    }
}

/// Stage bookkeeping for one generation
struct StageTracker {
    attempt_id: Uuid,
    stage: GenerationStage,
}

impl StageTracker {
    fn new(attempt_id: Uuid) -> Self {
        Self {
            attempt_id,
            stage: GenerationStage::Validated,
        }
    }

    fn advance(&mut self, next: GenerationStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "illegal transition {} -> {}",
            self.stage,
            next
        );
        debug!(attempt_id = %self.attempt_id, from = %self.stage, to = %next, "Generation stage");
        self.stage = next;
    }

    fn fail(&mut self, error: &DomainError) {
        error!(attempt_id = %self.attempt_id, stage = %self.stage, error = %error, "Feedback generation failed");
        self.advance(GenerationStage::Failed);
    }
}

/// Collaborators of a generation, cloned into each spawned task
#[derive(Clone)]
struct Pipeline {
    cache: Arc<CacheStore>,
    client: Arc<ResilientClient>,
    repository: Arc<dyn FeedbackRepository>,
    locks: Arc<RecordLocks>,
}

impl Pipeline {
    async fn run(self, request: ValidatedFeedbackRequest) -> Result<AiFeedback, DomainError> {
        let mut tracker = StageTracker::new(request.attempt_id);

        tracker.advance(GenerationStage::Evaluating);
        let evaluation: FeedbackEvaluation = match self
            .client
            .send_structured(prompts::evaluation_messages(&request), SendOptions::default())
            .await
        {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracker.fail(&e);
                return Err(e);
            }
        };

        tracker.advance(GenerationStage::Narrating);
        let summary = match self
            .client
            .send(prompts::narrative_messages(&request, &evaluation), SendOptions::default())
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                tracker.fail(&e);
                return Err(e);
            }
        };

        let feedback = AiFeedback::new(
            request.attempt_id,
            request.feedback_type,
            evaluation,
            summary.trim(),
        );

        let saved = match self.repository.save(feedback).await {
            Ok(saved) => saved,
            Err(e) => {
                tracker.fail(&e);
                return Err(e);
            }
        };
        tracker.advance(GenerationStage::Persisted);

        // The record is durable at this point; a cache miss later only costs a lookup.
        {
            let _guard = self.locks.lock(saved.id()).await;
            if let Err(e) = store_in_cache(&self.cache, &saved).await {
                warn!(feedback_id = %saved.id(), error = %e, "Failed to cache new feedback");
            }
        }

        info!(
            attempt_id = %saved.attempt_id(),
            feedback_id = %saved.id(),
            score = saved.overall_score(),
            "Feedback generated"
        );

        Ok(saved)
    }
}

async fn store_in_cache(cache: &CacheStore, feedback: &AiFeedback) -> Result<(), DomainError> {
    let entry = CachedFeedback {
        feedback: feedback.clone(),
        cached_at: Utc::now(),
    };

    cache
        .set(&cache_key(feedback.id()), &entry, CacheCategory::Feedback)
        .await
}

/// Produces, stores and serves AI feedback for practice attempts
///
/// Generations for the same attempt are deduplicated: while one is in flight,
/// later callers await the same result. Each generation runs in its own task,
/// so a caller that goes away does not cancel it.
#[derive(Clone)]
pub struct FeedbackService {
    pipeline: Pipeline,
    freshness: Duration,
    in_flight: Arc<Mutex<HashMap<Uuid, SharedGeneration>>>,
}

impl fmt::Debug for FeedbackService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackService")
            .field("model", &self.pipeline.client.model())
            .field("freshness", &self.freshness)
            .finish_non_exhaustive()
    }
}

impl FeedbackService {
    /// Fails with a configuration error when the cache has no TTL for feedback
    pub fn new(
        cache: Arc<CacheStore>,
        client: Arc<ResilientClient>,
        repository: Arc<dyn FeedbackRepository>,
    ) -> Result<Self, DomainError> {
        cache.settings().ttl().ttl_for(CacheCategory::Feedback)?;

        Ok(Self {
            pipeline: Pipeline {
                cache,
                client,
                repository,
                locks: Arc::new(RecordLocks::new(RECORD_LOCK_STRIPES)),
            },
            freshness: DEFAULT_FRESHNESS_WINDOW,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Validates the request and generates feedback for it
    ///
    /// Invalid requests are rejected before any provider call.
    pub async fn generate(&self, request: &FeedbackRequest) -> Result<AiFeedback, DomainError> {
        let validated = match request.validate() {
            Ok(validated) => validated,
            Err(e) => {
                warn!(
                    attempt_id = %request.attempt_id,
                    stage = %GenerationStage::Rejected,
                    error = %e,
                    "Feedback request rejected"
                );
                return Err(e);
            }
        };

        let attempt_id = validated.attempt_id;
        let generation = {
            let mut in_flight = self.in_flight.lock().await;

            match in_flight.get(&attempt_id) {
                Some(existing) => {
                    debug!(%attempt_id, "Joining in-flight generation");
                    existing.clone()
                }
                None => {
                    let generation = self.spawn_generation(validated);
                    in_flight.insert(attempt_id, generation.clone());
                    generation
                }
            }
        };

        generation.await
    }

    // Must be called with the in-flight lock held: the task removes its own
    // entry, and that removal cannot happen before the insert.
    fn spawn_generation(&self, request: ValidatedFeedbackRequest) -> SharedGeneration {
        let attempt_id = request.attempt_id;
        let pipeline = self.pipeline.clone();
        let in_flight = Arc::clone(&self.in_flight);

        info!(%attempt_id, feedback_type = request.feedback_type.as_str(), "Starting feedback generation");

        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(pipeline.run(request))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(DomainError::internal("Feedback generation panicked")));

            in_flight.lock().await.remove(&attempt_id);
            result
        });

        async move {
            handle.await.map_err(|e| {
                DomainError::internal(format!("Feedback generation task failed: {}", e))
            })?
        }
        .boxed()
        .shared()
    }

    /// Returns the record, served from cache while it is fresh
    pub async fn get(&self, feedback_id: &str) -> Result<Option<AiFeedback>, DomainError> {
        let id = parse_uuid("feedbackId", feedback_id)?;

        if let Some(feedback) = self.cached(id).await? {
            return Ok(Some(feedback));
        }

        let _guard = self.pipeline.locks.lock(id).await;

        // Another reader may have refilled the entry while we waited
        if let Some(feedback) = self.cached(id).await? {
            return Ok(Some(feedback));
        }

        let Some(feedback) = self.pipeline.repository.find_by_id(id).await? else {
            return Ok(None);
        };

        store_in_cache(&self.pipeline.cache, &feedback).await?;
        Ok(Some(feedback))
    }

    async fn cached(&self, id: Uuid) -> Result<Option<AiFeedback>, DomainError> {
        let Some(entry) = self.pipeline.cache.get::<CachedFeedback>(&cache_key(id)).await? else {
            return Ok(None);
        };

        if self.is_fresh(&entry) {
            debug!(feedback_id = %id, "Feedback served from cache");
            Ok(Some(entry.feedback))
        } else {
            debug!(feedback_id = %id, "Cached feedback is stale");
            Ok(None)
        }
    }

    /// All feedback for an attempt, newest first
    pub async fn get_by_attempt(&self, attempt_id: &str) -> Result<Vec<AiFeedback>, DomainError> {
        let attempt_id = parse_uuid("attemptId", attempt_id)?;
        let mut feedback = self.pipeline.repository.find_by_attempt(attempt_id).await?;

        feedback.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(feedback)
    }

    /// Applies `patch` to an existing record and drops its cached copy
    pub async fn update(&self, feedback_id: &str, patch: &FeedbackPatch) -> Result<(), DomainError> {
        let id = parse_uuid("feedbackId", feedback_id)?;
        let _guard = self.pipeline.locks.lock(id).await;

        if self.pipeline.repository.find_by_id(id).await?.is_none() {
            return Err(DomainError::not_found(format!("Feedback '{}' not found", id)));
        }

        patch.validate()?;
        self.pipeline.repository.update(id, patch).await?;
        self.pipeline.cache.delete(&cache_key(id)).await?;

        info!(feedback_id = %id, "Feedback updated");
        Ok(())
    }

    fn is_fresh(&self, entry: &CachedFeedback) -> bool {
        match Utc::now().signed_duration_since(entry.cached_at).to_std() {
            Ok(age) => age < self.freshness,
            // cached_at is in the future (clock skew between instances)
            Err(_) => true,
        }
    }
}
