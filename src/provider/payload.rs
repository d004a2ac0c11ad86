//! Inbound webhook payload types and classification

use serde::Deserialize;

use crate::db::MessageKind;

/// Placeholder body stored for audio messages until transcription lands
pub const AUDIO_PLACEHOLDER: &str = "[Áudio recebido]";

/// Caption fallback for images without one
pub const IMAGE_PLACEHOLDER: &str = "[Imagem recebida]";

/// Caption fallback for videos without one
pub const VIDEO_PLACEHOLDER: &str = "[Vídeo recebido]";

/// One webhook delivery from the messaging provider
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    /// Event discriminator, e.g. `messages.upsert`
    pub event: Option<String>,
    pub instance: Option<String>,
    pub data: Option<MessageData>,
}

impl WebhookEvent {
    /// Whether this delivery carries an inbound message
    #[must_use]
    pub fn is_message_event(&self) -> bool {
        self.event.as_deref().is_some_and(|e| {
            e.eq_ignore_ascii_case("messages.upsert") || e.eq_ignore_ascii_case("messages_upsert")
        })
    }
}

/// Message portion of the webhook payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub key: Option<MessageKey>,
    /// Sender display name (logged, never stored)
    pub push_name: Option<String>,
    pub message: Option<MessageContent>,
    pub message_timestamp: Option<i64>,
}

/// Provider-side message identity
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    /// Counterparty JID, e.g. `5511999999999@s.whatsapp.net`
    pub remote_jid: Option<String>,
    /// True when the message was sent by the instance itself (echo)
    #[serde(default)]
    pub from_me: bool,
    /// Provider message id, doubles as the media reference for audio
    pub id: Option<String>,
}

/// Polymorphic message body variants
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    pub conversation: Option<String>,
    pub extended_text_message: Option<ExtendedTextMessage>,
    pub audio_message: Option<AudioMessage>,
    pub image_message: Option<MediaMessage>,
    pub video_message: Option<MediaMessage>,
    pub document_message: Option<DocumentMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ExtendedTextMessage {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMessage {
    pub seconds: Option<i64>,
    pub mimetype: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaMessage {
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMessage {
    pub file_name: Option<String>,
    pub caption: Option<String>,
}

impl MessageContent {
    /// Classify the payload shape into a closed message kind
    #[must_use]
    pub const fn classify(&self) -> MessageKind {
        if self.audio_message.is_some() {
            MessageKind::Audio
        } else if self.image_message.is_some() {
            MessageKind::Image
        } else if self.video_message.is_some() {
            MessageKind::Video
        } else if self.document_message.is_some() {
            MessageKind::Document
        } else {
            MessageKind::Text
        }
    }

    /// Reduce the payload to a stored text representation
    ///
    /// Media messages fall back to their caption, then to a fixed placeholder.
    #[must_use]
    pub fn effective_text(&self) -> String {
        match self.classify() {
            MessageKind::Text => self
                .conversation
                .clone()
                .or_else(|| {
                    self.extended_text_message
                        .as_ref()
                        .and_then(|m| m.text.clone())
                })
                .unwrap_or_default(),
            MessageKind::Audio => AUDIO_PLACEHOLDER.to_string(),
            MessageKind::Image => self
                .image_message
                .as_ref()
                .and_then(|m| m.caption.clone())
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| IMAGE_PLACEHOLDER.to_string()),
            MessageKind::Video => self
                .video_message
                .as_ref()
                .and_then(|m| m.caption.clone())
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| VIDEO_PLACEHOLDER.to_string()),
            MessageKind::Document => {
                let doc = self.document_message.as_ref();
                doc.and_then(|m| m.caption.clone())
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| {
                        let name = doc
                            .and_then(|m| m.file_name.as_deref())
                            .unwrap_or("arquivo");
                        format!("[Documento: {name}]")
                    })
            }
        }
    }
}

/// Whether a JID addresses a group chat rather than an individual
#[must_use]
pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with("@g.us")
}

/// Normalize a counterparty JID to an E.164-like `+digits` form
///
/// Strips the device suffix (`:NN`) and server suffix (`@…`), then keeps
/// ASCII digits only. Returns `None` when nothing usable remains.
#[must_use]
pub fn normalize_counterparty(jid: &str) -> Option<String> {
    let user = jid.split('@').next().unwrap_or(jid);
    let user = user.split(':').next().unwrap_or(user);

    let digits: String = user.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("+{digits}"))
    }
}
