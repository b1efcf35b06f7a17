use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{SessionError, SessionResult};
use crate::types::{ChatMessage, Role};

/// Seam between the session and the remote chat-completion service. One call
/// per turn; the whole assistant message arrives atomically or the turn
/// fails atomically.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> SessionResult<ChatMessage>;
}

#[derive(serde::Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ApiMessage {
    role: Option<Role>,
    content: String,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: Option<ApiMessage>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// HTTP client for the chat-completion endpoint.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpCompletionClient {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.api_url,
            api_key: config.api_key,
        }
    }

    fn parse_success(body: &str) -> SessionResult<ChatMessage> {
        let parsed: CompletionResponse = serde_json::from_str(body)
            .map_err(|_| SessionError::Api("malformed response from server".into()))?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .ok_or_else(|| SessionError::Api("response carried no assistant message".into()))?;
        Ok(ChatMessage {
            role: message.role.unwrap_or(Role::Assistant),
            content: message.content,
            created_at: Some(time::OffsetDateTime::now_utc()),
        })
    }

    fn parse_failure(status: reqwest::StatusCode, body: &str) -> SessionError {
        // Prefer the server-provided message when the error body parses.
        if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body)
            && let Some(detail) = parsed.error
        {
            return SessionError::Api(detail.message);
        }
        SessionError::Api(format!("API request failed with status {status}"))
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> SessionResult<ChatMessage> {
        // Credential check comes first, before any network I/O.
        let Some(key) = &self.api_key else {
            return Err(SessionError::Config("No API key was found.".into()));
        };

        debug!(model, history = messages.len(), "sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&CompletionRequest { model, messages })
            .send()
            .await
            .map_err(|err| SessionError::Network(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SessionError::Network(err.to_string()))?;

        if !status.is_success() {
            return Err(Self::parse_failure(status, &body));
        }

        Self::parse_success(&body)
    }
}
