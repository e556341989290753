use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// JSON payload expected inside a completion's text
pub trait StructuredCompletion: DeserializeOwned + Send {
    /// Semantic checks beyond what deserialization enforces
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Completion response in the chat-completions shape
///
/// Every field is optional on the wire; `completion_text` decides whether the
/// payload is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    /// Kept untyped so non-text content can be detected rather than rejected by serde
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

impl LlmResponse {
    /// Response carrying a single text completion
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            id: None,
            model: None,
            choices: vec![Choice {
                message: Some(ChoiceMessage {
                    role: Some("assistant".to_string()),
                    content: Some(serde_json::Value::String(content.into())),
                }),
                finish_reason: Some("stop".to_string()),
            }],
        }
    }

    /// Text of the first choice, or a description of what is malformed
    pub fn completion_text(&self) -> Result<&str, String> {
        let choice = self
            .choices
            .first()
            .ok_or_else(|| "response has no choices".to_string())?;

        let message = choice
            .message
            .as_ref()
            .ok_or_else(|| "first choice has no message".to_string())?;

        match &message.content {
            Some(serde_json::Value::String(text)) if !text.trim().is_empty() => Ok(text),
            Some(serde_json::Value::String(_)) => Err("completion content is empty".to_string()),
            Some(other) => Err(format!("completion content is not text: {}", other)),
            None => Err("first choice has no content".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_text() {
        let response = LlmResponse::text("Great structure");
        assert_eq!(response.completion_text().unwrap(), "Great structure");
    }

    #[test]
    fn test_missing_choices_is_malformed() {
        let response: LlmResponse = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(response.completion_text().is_err());
    }

    #[test]
    fn test_non_text_content_is_malformed() {
        let response: LlmResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": [1, 2]}}]}"#).unwrap();

        let err = response.completion_text().unwrap_err();
        assert!(err.contains("not text"));
    }

    #[test]
    fn test_blank_content_is_malformed() {
        let response = LlmResponse::text("   ");
        assert!(response.completion_text().is_err());
    }
}
