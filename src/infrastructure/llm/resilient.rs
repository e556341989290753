//! Completion client with a per-attempt timeout and bounded retries

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::llm::StructuredCompletion;
use crate::domain::{DomainError, LlmProvider, LlmRequest, Message, RetryPolicy, with_retry};

/// Per-call overrides of the client's defaults
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SendOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl SendOptions {
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Wraps a provider with the retry loop and response validation
///
/// No results are cached here. Malformed completions are reported as
/// transient so the policy retries them.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: None,
            temperature: None,
            policy,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn build_request(&self, messages: Vec<Message>, options: SendOptions) -> Result<LlmRequest, DomainError> {
        if messages.is_empty() {
            return Err(DomainError::validation("Completion request has no messages"));
        }

        let mut request = LlmRequest::new(messages);
        request.temperature = options.temperature.or(self.temperature);
        request.max_tokens = options.max_tokens.or(self.max_tokens);

        Ok(request)
    }

    /// Sends the conversation and returns the completion text
    pub async fn send(&self, messages: Vec<Message>, options: SendOptions) -> Result<String, DomainError> {
        let request = self.build_request(messages, options)?;
        let provider = self.provider.as_ref();
        let model = self.model.as_str();
        let origin = provider.provider_name();

        info!(provider = origin, model, "Sending completion request");

        with_retry(&self.policy, "completion", |attempt| {
            let request = request.clone();
            async move {
                debug!(provider = origin, attempt, "Completion attempt");
                let response = provider.chat(model, request).await?;

                response
                    .completion_text()
                    .map(str::to_string)
                    .map_err(|reason| DomainError::transient(origin, format!("Malformed response: {}", reason)))
            }
        })
        .await
    }

    /// Sends a single user prompt
    pub async fn send_prompt(&self, prompt: impl Into<String>, options: SendOptions) -> Result<String, DomainError> {
        self.send(vec![Message::user(prompt)], options).await
    }

    /// Sends the conversation and parses the completion as JSON `T`
    ///
    /// A completion that does not parse, or that fails `T::check`, counts as a
    /// malformed response and is retried like any other transient failure.
    pub async fn send_structured<T: StructuredCompletion>(
        &self,
        messages: Vec<Message>,
        options: SendOptions,
    ) -> Result<T, DomainError> {
        let request = self.build_request(messages, options)?;
        let provider = self.provider.as_ref();
        let model = self.model.as_str();
        let origin = provider.provider_name();

        info!(provider = origin, model, "Sending structured completion request");

        with_retry(&self.policy, "structured completion", |attempt| {
            let request = request.clone();
            async move {
                debug!(provider = origin, attempt, "Structured completion attempt");
                let response = provider.chat(model, request).await?;

                let text = response
                    .completion_text()
                    .map_err(|reason| DomainError::transient(origin, format!("Malformed response: {}", reason)))?;

                parse_structured::<T>(text)
                    .map_err(|reason| DomainError::transient(origin, format!("Malformed response: {}", reason)))
            }
        })
        .await
    }
}

/// Extract a JSON object from completion text that may wrap it in prose or fences
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

fn parse_structured<T: StructuredCompletion>(text: &str) -> Result<T, String> {
    let json = extract_json(text).ok_or_else(|| "completion contains no JSON object".to_string())?;
    let value: T = serde_json::from_str(json).map_err(|e| format!("invalid JSON payload: {}", e))?;
    value.check()?;
    Ok(value)
}
