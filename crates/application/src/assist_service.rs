use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use sanctum_core::{AppError, AppResult, NonEmptyString, UserIdentity};
use tracing::info;

use crate::FixedWindowRateLimiter;

/// Upper bound on prompt length forwarded to the assistant provider.
pub const MAX_ASSIST_PROMPT_CHARS: usize = 4_000;

/// Prompt forwarded to the assistant provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistRequest {
    /// Optional persona or system instructions.
    pub system_prompt: Option<String>,
    /// User prompt.
    pub prompt: NonEmptyString,
}

/// Completion returned by the assistant provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistReply {
    /// Generated text.
    pub content: String,
    /// Model that produced the text.
    pub model: String,
}

/// Port for the hosted chat-completion provider.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Produces a completion for one request.
    async fn complete(&self, request: AssistRequest) -> AppResult<AssistReply>;
}

/// Throttled access to the assistant provider.
#[derive(Clone)]
pub struct AssistService {
    limiter: FixedWindowRateLimiter,
    client: Arc<dyn AssistantClient>,
}

impl AssistService {
    /// Creates a new assist service.
    #[must_use]
    pub fn new(limiter: FixedWindowRateLimiter, client: Arc<dyn AssistantClient>) -> Self {
        Self { limiter, client }
    }

    /// Runs one throttled assist request.
    ///
    /// The quota key is the authenticated subject, falling back to the client
    /// IP. The attempt is counted before the prompt is validated.
    pub async fn assist(
        &self,
        identity: Option<&UserIdentity>,
        client_ip: Option<IpAddr>,
        system_prompt: Option<String>,
        prompt: String,
    ) -> AppResult<AssistReply> {
        let key = rate_limit_key(identity, client_ip);
        self.limiter.require(&key).await?;

        let prompt = NonEmptyString::new(prompt)?;
        if prompt.as_str().chars().count() > MAX_ASSIST_PROMPT_CHARS {
            return Err(AppError::Validation(format!(
                "prompt must not exceed {MAX_ASSIST_PROMPT_CHARS} characters"
            )));
        }

        let reply = self
            .client
            .complete(AssistRequest {
                system_prompt: system_prompt.filter(|value| !value.trim().is_empty()),
                prompt,
            })
            .await?;
        info!(key = %key, model = %reply.model, "assist request completed");

        Ok(reply)
    }
}

/// Builds the identity string used for assist quotas.
#[must_use]
pub fn rate_limit_key(identity: Option<&UserIdentity>, client_ip: Option<IpAddr>) -> String {
    match (identity, client_ip) {
        (Some(identity), _) => format!("user:{}", identity.subject()),
        (None, Some(ip)) => format!("ip:{ip}"),
        (None, None) => "ip:unknown".to_owned(),
    }
}
