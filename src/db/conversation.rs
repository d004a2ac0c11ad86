//! Append-only conversation log per (tenant, counterparty) pair

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// Default number of prior turns handed to the assistant
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Direction of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Sent by the counterparty to the establishment
    Inbound,
    /// Sent by the assistant on behalf of the establishment
    Outbound,
}

impl MessageDirection {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            _ => None,
        }
    }
}

/// Kind of message content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Audio,
    Image,
    Video,
    Document,
}

impl MessageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "audio" => Some(Self::Audio),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "document" => Some(Self::Document),
            _ => None,
        }
    }
}

/// A message row as stored
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub tenant_id: String,
    pub counterparty: String,
    pub direction: MessageDirection,
    pub kind: MessageKind,
    pub body: String,
    pub transcription: Option<String>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// One prior conversation turn, reduced for prompt assembly
///
/// `text` is the transcription when present, otherwise the body.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub direction: MessageDirection,
    pub text: String,
}

/// Storage seam between the webhook dispatcher and message persistence
pub trait ConversationStore: Send + Sync {
    /// Durably record one message; never overwrites prior rows
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    fn append(
        &self,
        tenant_id: &str,
        counterparty: &str,
        direction: MessageDirection,
        kind: MessageKind,
        body: &str,
    ) -> Result<StoredMessage>;

    /// True iff no rows exist for this (tenant, counterparty) pair
    ///
    /// # Errors
    ///
    /// Returns error if the query fails
    fn is_first_contact(&self, tenant_id: &str, counterparty: &str) -> Result<bool>;

    /// Up to `limit` messages strictly before the anchor row, chronological ascending
    ///
    /// # Errors
    ///
    /// Returns error if the query fails
    fn recent_history(
        &self,
        tenant_id: &str,
        counterparty: &str,
        before_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>>;

    /// Attach a transcription to a previously stored audio row
    ///
    /// # Errors
    ///
    /// Returns error if the update fails
    fn backfill_transcription(&self, message_id: &str, transcription: &str) -> Result<()>;
}

/// Conversation repository backed by `SQLite`
#[derive(Clone)]
pub struct ConversationRepo {
    pool: DbPool,
}

impl ConversationRepo {
    /// Create a new conversation repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ConversationStore for ConversationRepo {
    fn append(
        &self,
        tenant_id: &str,
        counterparty: &str,
        direction: MessageDirection,
        kind: MessageKind,
        body: &str,
    ) -> Result<StoredMessage> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        // Outbound rows are born processed; inbound rows stay 0 for operator queries
        let processed = matches!(direction, MessageDirection::Outbound);

        conn.execute(
            "INSERT INTO messages
                 (id, establishment_id, counterparty, direction, kind, body, processed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                &id,
                tenant_id,
                counterparty,
                direction.as_str(),
                kind.as_str(),
                body,
                i64::from(processed),
                &now_str
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(StoredMessage {
            id,
            tenant_id: tenant_id.to_string(),
            counterparty: counterparty.to_string(),
            direction,
            kind,
            body: body.to_string(),
            transcription: None,
            processed,
            created_at: now,
        })
    }

    fn is_first_contact(&self, tenant_id: &str, counterparty: &str) -> Result<bool> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE establishment_id = ?1 AND counterparty = ?2",
                [tenant_id, counterparty],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(count == 0)
    }

    fn recent_history(
        &self,
        tenant_id: &str,
        counterparty: &str,
        before_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        // Ties on created_at are broken by rowid so the anchor row and its
        // successors never leak into the window
        let mut stmt = conn
            .prepare(
                "SELECT m.direction, m.body, m.transcription
                 FROM messages m, messages anchor
                 WHERE anchor.id = ?3
                   AND m.establishment_id = ?1 AND m.counterparty = ?2
                   AND (m.created_at < anchor.created_at
                        OR (m.created_at = anchor.created_at AND m.rowid < anchor.rowid))
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?4",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        let entries = stmt
            .query_map(
                rusqlite::params![tenant_id, counterparty, before_id, limit as i64],
                |row| {
                    let direction: String = row.get(0)?;
                    let body: String = row.get(1)?;
                    let transcription: Option<String> = row.get(2)?;
                    Ok(HistoryEntry {
                        direction: MessageDirection::from_str(&direction)
                            .unwrap_or(MessageDirection::Inbound),
                        text: transcription.unwrap_or(body),
                    })
                },
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        Ok(entries)
    }

    fn backfill_transcription(&self, message_id: &str, transcription: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let updated = conn
            .execute(
                "UPDATE messages SET transcription = ?1 WHERE id = ?2",
                [transcription, message_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        if updated == 0 {
            return Err(Error::Database(format!(
                "no message row with id {message_id}"
            )));
        }

        Ok(())
    }
}

impl ConversationRepo {
    /// Load one message by id (operator tooling and tests)
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or the row is absent
    pub fn get(&self, message_id: &str) -> Result<StoredMessage> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, establishment_id, counterparty, direction, kind, body,
                    transcription, processed, created_at
             FROM messages WHERE id = ?1",
            [message_id],
            |row| {
                Ok(StoredMessage {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    counterparty: row.get(2)?,
                    direction: MessageDirection::from_str(&row.get::<_, String>(3)?)
                        .unwrap_or(MessageDirection::Inbound),
                    kind: MessageKind::from_str(&row.get::<_, String>(4)?)
                        .unwrap_or(MessageKind::Text),
                    body: row.get(5)?,
                    transcription: row.get(6)?,
                    processed: row.get::<_, i64>(7)? != 0,
                    created_at: parse_datetime(&row.get::<_, String>(8)?),
                })
            },
        )
        .map_err(|e| Error::Database(e.to_string()))
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
