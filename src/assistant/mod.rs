//! Conversational assistant: transcription and reply generation

pub mod respond;
pub mod transcribe;

pub use respond::{CompletionClient, Responder, build_messages};
pub use transcribe::{SpeechTranscriber, Transcriber};

use crate::db::{HistoryEntry, MessageDirection};

/// Reply sent when an audio message could not be transcribed
pub const AUDIO_FALLBACK_MESSAGE: &str =
    "Desculpe, não consegui entender o áudio. Pode escrever sua mensagem em texto, por favor?";

/// Reply sent when reply generation fails
pub const GENERAL_FALLBACK_MESSAGE: &str =
    "Desculpe, tive um problema ao processar sua mensagem. Pode tentar novamente?";

/// Role of a conversation turn as seen by the completion endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One prior turn, ready for prompt assembly
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl From<HistoryEntry> for ChatTurn {
    fn from(entry: HistoryEntry) -> Self {
        let role = match entry.direction {
            MessageDirection::Inbound => ChatRole::User,
            MessageDirection::Outbound => ChatRole::Assistant,
        };
        Self {
            role,
            text: entry.text,
        }
    }
}
