use async_trait::async_trait;
use std::fmt::Debug;

use super::{LlmRequest, LlmResponse};
use crate::domain::DomainError;

/// Trait for completion providers (OpenAI-compatible endpoints, test doubles)
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a chat completion request
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted provider: pops queued outcomes, then falls back to a default
    #[derive(Debug)]
    pub struct MockLlmProvider {
        name: &'static str,
        script: Mutex<VecDeque<Result<LlmResponse, DomainError>>>,
        fallback: Option<Result<LlmResponse, DomainError>>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl MockLlmProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                script: Mutex::new(VecDeque::new()),
                fallback: None,
                delay: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Queues a text completion
        pub fn then_text(self, content: impl Into<String>) -> Self {
            self.then_response(LlmResponse::text(content))
        }

        pub fn then_response(self, response: LlmResponse) -> Self {
            self.script.lock().unwrap().push_back(Ok(response));
            self
        }

        pub fn then_error(self, error: DomainError) -> Self {
            self.script.lock().unwrap().push_back(Err(error));
            self
        }

        /// Outcome used once the script is exhausted
        pub fn always(mut self, outcome: Result<LlmResponse, DomainError>) -> Self {
            self.fallback = Some(outcome);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<LlmRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn chat(&self, _model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let next = self.script.lock().unwrap().pop_front();

            match next {
                Some(outcome) => outcome,
                None => self.fallback.clone().unwrap_or_else(|| {
                    Err(DomainError::transient(self.name, "No mock response configured"))
                }),
            }
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }
    }
}
