//! `OpenAI` chat completions provider

use super::types::{LlmMessage, LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Chat completions service implementation
pub struct OpenAIService {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAIService {
    pub fn new(api_key: String, model: String, base_url: &str) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }

        messages.extend(request.messages.iter().map(Self::translate_message));

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }

    fn translate_message(msg: &LlmMessage) -> OpenAIMessage {
        OpenAIMessage {
            role: msg.role.as_str().to_string(),
            content: Some(msg.text.clone()),
        }
    }

    fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let text = choice
            .message
            .content
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LlmError::unknown("Empty reply from model"))?;

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u64::from(u.prompt_tokens),
            output_tokens: u64::from(u.completion_tokens),
        });

        Ok(LlmResponse { text, usage })
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let openai_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        let openai_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(openai_response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Classify an error body returned by any `OpenAI` endpoint
pub(super) fn error_from_body(status: u16, body: &str) -> LlmError {
    match serde_json::from_str::<OpenAIErrorResponse>(body) {
        Ok(error_resp) => LlmError::from_status(status, &error_resp.error.message),
        Err(_) => LlmError::from_status(status, body),
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmErrorKind, MessageRole};
    use serde_json::json;

    fn service() -> OpenAIService {
        OpenAIService::new(
            "sk-test".to_string(),
            "gpt-4-turbo-2024-04-09".to_string(),
            "https://api.openai.com/v1/",
        )
        .unwrap()
    }

    #[test]
    fn system_instruction_leads_the_payload() {
        let request = LlmRequest {
            system: Some("be critical".to_string()),
            messages: vec![
                LlmMessage::new(MessageRole::User, "Give me a plot idea"),
                LlmMessage::new(MessageRole::Assistant, "A moon that hums"),
                LlmMessage::new(MessageRole::User, "Why does it hum?"),
            ],
            temperature: Some(0.7),
            max_tokens: Some(400),
        };

        let body = serde_json::to_value(service().translate_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4-turbo-2024-04-09");
        assert_eq!(body["max_tokens"], 400);
        assert_eq!(body["stream"], false);
        let roles: Vec<_> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(body["messages"][0]["content"], "be critical");
        assert_eq!(body["messages"][3]["content"], "Why does it hum?");
    }

    #[test]
    fn url_is_built_from_base() {
        assert_eq!(service().url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn first_choice_is_the_reply() {
        let resp: OpenAIResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Try a heist on Europa." } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19 }
        }))
        .unwrap();

        let normalized = OpenAIService::normalize_response(resp).unwrap();
        assert_eq!(normalized.text, "Try a heist on Europa.");
        assert_eq!(normalized.usage.output_tokens, 7);
    }

    #[test]
    fn empty_reply_is_an_error() {
        let resp: OpenAIResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        }))
        .unwrap();

        assert!(OpenAIService::normalize_response(resp).is_err());
    }

    #[test]
    fn error_body_message_is_used() {
        let err = error_from_body(
            429,
            r#"{"error":{"message":"slow down","type":"requests","code":null}}"#,
        );
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
        assert!(err.message.contains("slow down"));

        let err = error_from_body(502, "<html>bad gateway</html>");
        assert_eq!(err.kind, LlmErrorKind::ServerError);
    }
}
