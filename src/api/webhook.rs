//! Inbound webhook dispatcher

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::ApiState;
use crate::assistant::{AUDIO_FALLBACK_MESSAGE, GENERAL_FALLBACK_MESSAGE, ChatTurn};
use crate::db::{MessageDirection, MessageKind, TenantConfig, TenantResolution};
use crate::provider::payload::{WebhookEvent, is_group_jid, normalize_counterparty};
use crate::{Error, Result};

/// Characters kept in the acknowledgement's reply preview
const PREVIEW_CHARS: usize = 80;

/// Webhook acknowledgement body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_first_contact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl WebhookResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            is_first_contact: None,
            reply: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            is_first_contact: None,
            reply: None,
        }
    }
}

type Ack = (StatusCode, Json<WebhookResponse>);

fn ack_ok(message: &str) -> Ack {
    (StatusCode::OK, Json(WebhookResponse::ok(message)))
}

/// `POST /webhook` without an instance segment
pub async fn missing_instance() -> Ack {
    (
        StatusCode::BAD_REQUEST,
        Json(WebhookResponse::failure("missing instance credential")),
    )
}

/// Handle one inbound provider event
///
/// Always answers: internal failures are caught here and acknowledged
/// with a 500 body so the provider never retries on timeout.
pub async fn handle_event(
    State(state): State<Arc<ApiState>>,
    Path(instance): Path<String>,
    Json(event): Json<WebhookEvent>,
) -> Ack {
    if instance.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(WebhookResponse::failure("missing instance credential")),
        );
    }

    match process(&state, &instance, &event).await {
        Ok(ack) => ack,
        Err(e) => {
            tracing::error!(error = %e, "webhook processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookResponse::failure(format!("internal error: {e}"))),
            )
        }
    }
}

#[allow(clippy::too_many_lines)]
async fn process(state: &ApiState, instance: &str, event: &WebhookEvent) -> Result<Ack> {
    let tenant = match state.tenants.resolve(instance)? {
        TenantResolution::NotFound => {
            return Ok((
                StatusCode::NOT_FOUND,
                Json(WebhookResponse::failure("unknown instance")),
            ));
        }
        TenantResolution::Disabled => {
            tracing::debug!(%instance, "assistant disabled, ignoring event");
            return Ok(ack_ok("assistant disabled for this instance"));
        }
        TenantResolution::Active(tenant) => tenant,
    };

    if !event.is_message_event() {
        return Ok(ack_ok("event ignored"));
    }
    let Some(data) = &event.data else {
        return Ok(ack_ok("no message data"));
    };
    let Some(key) = &data.key else {
        return Ok(ack_ok("no message key"));
    };

    let Some(jid) = key.remote_jid.as_deref() else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(WebhookResponse::failure("missing counterparty")),
        ));
    };
    if is_group_jid(jid) {
        return Ok(ack_ok("group chats are ignored"));
    }
    let Some(counterparty) = normalize_counterparty(jid) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(WebhookResponse::failure("missing counterparty")),
        ));
    };

    // Echo suppression: never react to our own sends
    if key.from_me {
        return Ok(ack_ok("echo suppressed"));
    }

    let Some(content) = &data.message else {
        return Ok(ack_ok("no message content"));
    };
    let kind = content.classify();
    let body = content.effective_text();
    if body.is_empty() {
        return Ok(ack_ok("empty message"));
    }

    tracing::info!(
        tenant = %tenant.name,
        from = %counterparty,
        push_name = data.push_name.as_deref().unwrap_or(""),
        kind = kind.as_str(),
        "message received"
    );

    // First contact gets the welcome message, no LLM call
    if state.conversations.is_first_contact(&tenant.id, &counterparty)? {
        state
            .conversations
            .append(&tenant.id, &counterparty, MessageDirection::Inbound, kind, &body)?;
        let welcome =
            deliver_reply(state, instance, &tenant, &counterparty, &tenant.welcome_message)
                .await?;
        return Ok((
            StatusCode::OK,
            Json(WebhookResponse {
                success: true,
                message: "welcome message sent".to_string(),
                is_first_contact: Some(true),
                reply: Some(welcome),
            }),
        ));
    }

    let stored = state
        .conversations
        .append(&tenant.id, &counterparty, MessageDirection::Inbound, kind, &body)?;

    // Audio gets transcribed before the assistant sees it
    let effective_text = if kind == MessageKind::Audio {
        let transcribed = match key.id.as_deref() {
            Some(media_id) if !media_id.is_empty() => {
                state
                    .transcriber
                    .transcribe(instance, &tenant.api_key, media_id)
                    .await
            }
            _ => Err(Error::MediaFetch("missing media reference".to_string())),
        };

        match transcribed {
            Ok(text) => {
                state.conversations.backfill_transcription(&stored.id, &text)?;
                text
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed, asking for text");
                let fallback =
                    deliver_reply(state, instance, &tenant, &counterparty, AUDIO_FALLBACK_MESSAGE)
                        .await?;
                return Ok((
                    StatusCode::OK,
                    Json(WebhookResponse {
                        success: true,
                        message: "audio could not be transcribed".to_string(),
                        is_first_contact: Some(false),
                        reply: Some(fallback),
                    }),
                ));
            }
        }
    } else {
        body
    };

    let history: Vec<ChatTurn> = state
        .conversations
        .recent_history(&tenant.id, &counterparty, &stored.id, state.history_limit)?
        .into_iter()
        .map(ChatTurn::from)
        .collect();

    let reply_text = match state
        .responder
        .respond(
            &tenant.api_key,
            tenant.description.as_deref(),
            &history,
            &effective_text,
        )
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "reply generation failed, using fallback");
            GENERAL_FALLBACK_MESSAGE.to_string()
        }
    };

    let reply = deliver_reply(state, instance, &tenant, &counterparty, &reply_text).await?;

    Ok((
        StatusCode::OK,
        Json(WebhookResponse {
            success: true,
            message: "reply sent".to_string(),
            is_first_contact: Some(false),
            reply: Some(reply),
        }),
    ))
}

/// Persist an outbound reply, then attempt delivery
///
/// A send failure is logged but never escalated into the acknowledgement.
/// Returns the truncated preview for the response body.
async fn deliver_reply(
    state: &ApiState,
    instance: &str,
    tenant: &TenantConfig,
    counterparty: &str,
    text: &str,
) -> Result<String> {
    state.conversations.append(
        &tenant.id,
        counterparty,
        MessageDirection::Outbound,
        MessageKind::Text,
        text,
    )?;

    if let Err(e) = state.messenger.send_text(instance, counterparty, text).await {
        tracing::error!(error = %e, to = %counterparty, "failed to deliver reply");
    }

    Ok(preview(text))
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("Olá!"), "Olá!");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "á".repeat(200);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 1);
        assert!(cut.ends_with('…'));
    }
}
