//! Reply generation via the chat-completion endpoint

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatRole, ChatTurn};
use crate::{Error, Result};

/// Fixed assistant persona prepended to every completion request
const SYSTEM_PERSONA: &str = "Você é a assistente virtual de um salão de beleza. \
    Você pode agendar, confirmar e remarcar horários, e responder dúvidas sobre \
    serviços, preços e disponibilidade. Seja simpática e objetiva, e responda \
    sempre em português.";

/// Reply-generation seam between the webhook dispatcher and the LLM
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply to the user's text given the prior conversation
    ///
    /// # Errors
    ///
    /// Returns `Error::Completion`; the caller substitutes the fallback reply
    async fn respond(
        &self,
        api_key: &str,
        description: Option<&str>,
        history: &[ChatTurn],
        user_text: &str,
    ) -> Result<String>;
}

/// One chat-completion message
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Assemble the completion messages: persona, establishment context,
/// prior turns, then the new user turn last
#[must_use]
pub fn build_messages(
    description: Option<&str>,
    history: &[ChatTurn],
    user_text: &str,
) -> Vec<ChatMessage> {
    let system = description.map_or_else(
        || SYSTEM_PERSONA.to_string(),
        |d| format!("{SYSTEM_PERSONA}\n\nInformações sobre o estabelecimento: {d}"),
    );

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system",
        content: system,
    });
    for turn in history {
        messages.push(ChatMessage {
            role: turn.role.as_str(),
            content: turn.text.clone(),
        });
    }
    messages.push(ChatMessage {
        role: ChatRole::User.as_str(),
        content: user_text.to_string(),
    });

    messages
}

/// Responder backed by an OpenAI-style chat-completion endpoint
pub struct CompletionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl CompletionClient {
    /// Create a new completion client
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be built
    pub fn new(
        base_url: &str,
        model: &str,
        temperature: f64,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            max_tokens,
        })
    }
}

#[async_trait]
impl Responder for CompletionClient {
    async fn respond(
        &self,
        api_key: &str,
        description: Option<&str>,
        history: &[ChatTurn],
        user_text: &str,
    ) -> Result<String> {
        let messages = build_messages(description, history, user_text);

        let request = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Completion(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "completion error");
            return Err(Error::Completion(format!("completion returned {status}")));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(e.to_string()))?;

        let text = result
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Completion("empty completion".to_string()));
        }

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_ordering() {
        let history = vec![
            ChatTurn {
                role: ChatRole::User,
                text: "Oi".to_string(),
            },
            ChatTurn {
                role: ChatRole::Assistant,
                text: "Olá! Como posso ajudar?".to_string(),
            },
        ];

        let messages = build_messages(None, &history, "Quanto custa um corte?");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].role, "user");
        assert_eq!(messages[3].content, "Quanto custa um corte?");
    }

    #[test]
    fn test_description_appended_to_system() {
        let messages = build_messages(Some("Salão no centro, aberto de ter a sáb"), &[], "Oi");

        assert!(messages[0].content.contains("Salão no centro"));
        assert!(messages[0].content.starts_with(SYSTEM_PERSONA));
    }

    #[test]
    fn test_no_description_leaves_persona_only() {
        let messages = build_messages(None, &[], "Oi");
        assert_eq!(messages[0].content, SYSTEM_PERSONA);
    }
}
