//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Establishments (one row per connected WhatsApp instance)
        CREATE TABLE IF NOT EXISTS establishments (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            instance_token TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Assistant settings per establishment
        CREATE TABLE IF NOT EXISTS assistant_configs (
            establishment_id TEXT PRIMARY KEY REFERENCES establishments(id),
            api_key TEXT NOT NULL DEFAULT '',
            active INTEGER NOT NULL DEFAULT 1,
            welcome_message TEXT NOT NULL DEFAULT 'Olá! Como posso ajudar?',
            description TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Conversation messages, append-only
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            establishment_id TEXT NOT NULL REFERENCES establishments(id),
            counterparty TEXT NOT NULL,
            direction TEXT NOT NULL CHECK(direction IN ('inbound', 'outbound')),
            kind TEXT NOT NULL CHECK(kind IN ('text', 'audio', 'image', 'video', 'document')),
            body TEXT NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(establishment_id, counterparty, created_at);

        PRAGMA user_version = 1;
        ",
    )?;

    tracing::info!("migrated to schema v1");
    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Audio support: transcribed text stored next to the placeholder body
        ALTER TABLE messages ADD COLUMN transcription TEXT;

        PRAGMA user_version = 2;
        ",
    )?;

    tracing::info!("migrated to schema v2 (audio transcription)");
    Ok(())
}
