//! OpenAI-compatible chat completion client.

use async_trait::async_trait;
use sanctum_application::{AssistReply, AssistRequest, AssistantClient};
use sanctum_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// HTTP implementation of the assistant client port.
#[derive(Clone)]
pub struct HttpAssistantClient {
    http_client: reqwest::Client,
    completions_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpAssistantClient {
    /// Creates a client targeting `{base_url}/chat/completions`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            completions_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn build_messages(request: &AssistRequest) -> Vec<ChatMessage<'_>> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system_prompt) = request.system_prompt.as_deref() {
        messages.push(ChatMessage {
            role: "system",
            content: system_prompt,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: request.prompt.as_str(),
    });

    messages
}

fn into_reply(response: ChatCompletionResponse, fallback_model: &str) -> AppResult<AssistReply> {
    let content = response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .ok_or_else(|| {
            AppError::Internal("assistant provider returned no completion".to_owned())
        })?;

    Ok(AssistReply {
        content,
        model: response
            .model
            .unwrap_or_else(|| fallback_model.to_owned()),
    })
}

#[async_trait]
impl AssistantClient for HttpAssistantClient {
    async fn complete(&self, request: AssistRequest) -> AppResult<AssistReply> {
        let payload = ChatCompletionRequest {
            model: self.model.as_str(),
            messages: build_messages(&request),
        };

        let mut builder = self.http_client.post(&self.completions_url).json(&payload);
        if let Some(api_key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|error| {
            AppError::Internal(format!("assistant provider request failed: {error}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "assistant provider rejected request");
            return Err(AppError::Internal(format!(
                "assistant provider returned status {status}"
            )));
        }

        let body = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|error| {
                AppError::Internal(format!("invalid assistant provider response: {error}"))
            })?;

        into_reply(body, &self.model)
    }
}

#[cfg(test)]
mod tests {
    use sanctum_application::AssistRequest;
    use sanctum_core::NonEmptyString;

    use super::{ChatCompletionResponse, HttpAssistantClient, build_messages, into_reply};

    fn request(system_prompt: Option<&str>) -> AssistRequest {
        let Ok(prompt) = NonEmptyString::new("Tell me about the archive") else {
            panic!("prompt must be valid");
        };
        AssistRequest {
            system_prompt: system_prompt.map(str::to_owned),
            prompt,
        }
    }

    #[test]
    fn completions_url_ignores_trailing_slash() {
        let client = HttpAssistantClient::new(
            reqwest::Client::new(),
            "https://api.example.test/v1/",
            None,
            "small",
        );

        assert_eq!(
            client.completions_url,
            "https://api.example.test/v1/chat/completions"
        );
    }

    #[test]
    fn system_prompt_precedes_user_prompt() {
        let with_system = request(Some("You are the archivist."));
        let messages = build_messages(&with_system);
        let roles: Vec<&str> = messages.iter().map(|message| message.role).collect();
        assert_eq!(roles, vec!["system", "user"]);

        let without_system = request(None);
        assert_eq!(build_messages(&without_system).len(), 1);
    }

    #[test]
    fn reply_takes_first_choice_and_falls_back_to_configured_model() {
        let parsed = serde_json::from_str::<ChatCompletionResponse>(
            r#"{ "choices": [{ "message": { "content": "The archive is old." } }] }"#,
        );
        let Ok(parsed) = parsed else {
            panic!("response must parse");
        };

        let reply = into_reply(parsed, "small");
        assert!(
            matches!(reply, Ok(ref value) if value.content == "The archive is old." && value.model == "small")
        );
    }

    #[test]
    fn empty_choices_is_an_error() {
        let parsed = serde_json::from_str::<ChatCompletionResponse>(r#"{ "model": "m", "choices": [] }"#);
        let Ok(parsed) = parsed else {
            panic!("response must parse");
        };

        assert!(into_reply(parsed, "small").is_err());
    }
}
