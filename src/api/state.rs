//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::cache::CacheStore;
use crate::infrastructure::services::FeedbackService;

/// Handles shared by every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub feedback_service: Arc<FeedbackService>,
    pub cache: Arc<CacheStore>,
}

impl AppState {
    pub fn new(feedback_service: Arc<FeedbackService>, cache: Arc<CacheStore>) -> Self {
        Self {
            feedback_service,
            cache,
        }
    }
}
