//! `OpenAI` assistants (thread + run) provider

use super::openai::error_from_body;
use super::types::{RunHandle, RunSnapshot, RunStatus, ThreadHandle};
use super::{AssistantsApi, LlmError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const BETA_HEADER: &str = "assistants=v2";

/// Assistants API client
pub struct OpenAIAssistants {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIAssistants {
    pub fn new(api_key: String, base_url: &str) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", BETA_HEADER)
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, LlmError> {
        let response = self
            .authorized(builder)
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

        serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e} - body: {body}")))
    }
}

#[async_trait]
impl AssistantsApi for OpenAIAssistants {
    async fn create_thread(&self) -> Result<ThreadHandle, LlmError> {
        let created: ObjectId = self
            .execute(self.client.post(self.url("threads")).json(&json!({})))
            .await?;
        tracing::debug!(thread_id = %created.id, "Created assistants thread");
        Ok(ThreadHandle(created.id))
    }

    async fn add_user_message(&self, thread: &ThreadHandle, text: &str) -> Result<(), LlmError> {
        let body = CreateMessage {
            role: "user",
            content: text,
        };
        let _: ObjectId = self
            .execute(
                self.client
                    .post(self.url(&format!("threads/{}/messages", thread.as_str())))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn start_run(
        &self,
        thread: &ThreadHandle,
        assistant_id: &str,
        additional_instructions: Option<&str>,
    ) -> Result<RunHandle, LlmError> {
        let body = CreateRun {
            assistant_id,
            additional_instructions,
        };
        let run: RunObject = self
            .execute(
                self.client
                    .post(self.url(&format!("threads/{}/runs", thread.as_str())))
                    .json(&body),
            )
            .await?;
        Ok(RunHandle(run.id))
    }

    async fn run_status(
        &self,
        thread: &ThreadHandle,
        run: &RunHandle,
    ) -> Result<RunSnapshot, LlmError> {
        let run: RunObject = self
            .execute(self.client.get(self.url(&format!(
                "threads/{}/runs/{}",
                thread.as_str(),
                run.as_str()
            ))))
            .await?;
        Ok(run.into())
    }

    async fn cancel_run(&self, thread: &ThreadHandle, run: &RunHandle) -> Result<(), LlmError> {
        let cancelled: RunObject = self
            .execute(self.client.post(self.url(&format!(
                "threads/{}/runs/{}/cancel",
                thread.as_str(),
                run.as_str()
            ))))
            .await?;
        tracing::debug!(run_id = %cancelled.id, status = ?cancelled.status, "Requested run cancellation");
        Ok(())
    }

    async fn latest_assistant_message(&self, thread: &ThreadHandle) -> Result<String, LlmError> {
        let list: MessageList = self
            .execute(
                self.client
                    .get(self.url(&format!("threads/{}/messages", thread.as_str())))
                    .query(&[("order", "desc"), ("limit", "1")]),
            )
            .await?;
        list.latest_assistant_text()
            .ok_or_else(|| LlmError::unknown("Run completed without an assistant message"))
    }
}

// Assistants API types

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateRun<'a> {
    assistant_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_instructions: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl From<RunObject> for RunSnapshot {
    fn from(run: RunObject) -> Self {
        RunSnapshot {
            status: run.status,
            last_error: run.last_error.map(|e| match e.code {
                Some(code) => format!("{code}: {}", e.message),
                None => e.message,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageContent {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

impl MessageList {
    fn latest_assistant_text(self) -> Option<String> {
        let message = self.data.into_iter().find(|m| m.role == "assistant")?;
        let text = message
            .content
            .into_iter()
            .filter_map(|c| match c {
                MessageContent::Text { text } => Some(text.value),
                MessageContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_object_maps_status_and_error() {
        let run: RunObject = serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "status": "failed",
            "last_error": { "code": "server_error", "message": "boom" }
        }))
        .unwrap();

        let snapshot = RunSnapshot::from(run);
        assert_eq!(snapshot.status, RunStatus::Failed);
        assert_eq!(snapshot.last_error.as_deref(), Some("server_error: boom"));
    }

    #[test]
    fn unknown_run_status_is_tolerated() {
        let run: RunObject =
            serde_json::from_value(json!({ "id": "run_1", "status": "paused_for_lunch" })).unwrap();
        assert_eq!(run.status, RunStatus::Unknown);
        assert!(!run.status.is_terminal());
    }

    #[test]
    fn cancel_acknowledgement_is_still_in_flight() {
        let run: RunObject =
            serde_json::from_value(json!({ "id": "run_1", "status": "cancelling" })).unwrap();
        assert_eq!(run.status, RunStatus::Cancelling);
        assert!(!run.status.is_terminal());
    }

    #[test]
    fn newest_assistant_text_is_extracted() {
        let list: MessageList = serde_json::from_value(json!({
            "object": "list",
            "data": [{
                "id": "msg_2",
                "role": "assistant",
                "content": [
                    { "type": "text", "text": { "value": "What if the colony", "annotations": [] } },
                    { "type": "image_file", "image_file": { "file_id": "f" } },
                    { "type": "text", "text": { "value": "never left Earth?", "annotations": [] } }
                ]
            }]
        }))
        .unwrap();

        assert_eq!(
            list.latest_assistant_text().as_deref(),
            Some("What if the colony\nnever left Earth?")
        );
    }

    #[test]
    fn user_only_listing_has_no_reply() {
        let list: MessageList = serde_json::from_value(json!({
            "data": [{ "role": "user", "content": [{ "type": "text", "text": { "value": "hi" } }] }]
        }))
        .unwrap();
        assert!(list.latest_assistant_text().is_none());
    }

    #[test]
    fn run_request_omits_missing_instructions() {
        let body = serde_json::to_value(CreateRun {
            assistant_id: "asst_1",
            additional_instructions: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "assistant_id": "asst_1" }));
    }
}
