//! Shared test helpers
//!
//! Builds the webhook router over an in-memory database with mock
//! collaborators that record every call.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower::ServiceExt;

use atende_gateway::api::{self, ApiState};
use atende_gateway::assistant::{ChatTurn, Responder, Transcriber};
use atende_gateway::db::{self, ConversationRepo, DbPool, TenantRepo};
use atende_gateway::provider::Messenger;
use atende_gateway::{Error, Result};

pub const INSTANCE: &str = "inst-1";
pub const JID: &str = "5511999999999@s.whatsapp.net";
pub const NUMBER: &str = "+5511999999999";
pub const WELCOME: &str = "Olá! Como posso ajudar?";

pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Seed an active tenant and return its id
pub fn seed_tenant(pool: &DbPool) -> String {
    TenantRepo::new(pool.clone())
        .create(
            "Studio Bela",
            INSTANCE,
            "sk-test",
            Some(WELCOME),
            Some("Salão de beleza no centro, aberto de terça a sábado"),
        )
        .expect("failed to seed tenant")
}

/// One recorded outbound send
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub instance: String,
    pub number: String,
    pub text: String,
}

/// Mock messenger recording sends, optionally failing every call
pub struct MockMessenger {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail: bool,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_text(&self, instance: &str, number: &str, text: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Send("mock send failure".to_string()));
        }
        self.sent.lock().await.push(SentMessage {
            instance: instance.to_string(),
            number: number.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Mock transcriber: `Some` transcript means success, `None` means failure
pub struct MockTranscriber {
    transcript: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTranscriber {
    pub fn ok(transcript: &str) -> Self {
        Self {
            transcript: Some(transcript.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _instance: &str, _api_key: &str, media_id: &str) -> Result<String> {
        self.calls.lock().await.push(media_id.to_string());
        self.transcript
            .clone()
            .ok_or_else(|| Error::Transcription("mock transcription failure".to_string()))
    }
}

/// One recorded completion request
#[derive(Debug, Clone)]
pub struct RecordedPrompt {
    pub history: Vec<ChatTurn>,
    pub user_text: String,
}

/// Mock responder: `Some` reply means success, `None` means failure
pub struct MockResponder {
    reply: Option<String>,
    calls: Arc<Mutex<Vec<RecordedPrompt>>>,
}

impl MockResponder {
    pub fn ok(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn calls(&self) -> Vec<RecordedPrompt> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn respond(
        &self,
        _api_key: &str,
        _description: Option<&str>,
        history: &[ChatTurn],
        user_text: &str,
    ) -> Result<String> {
        self.calls.lock().await.push(RecordedPrompt {
            history: history.to_vec(),
            user_text: user_text.to_string(),
        });
        self.reply
            .clone()
            .ok_or_else(|| Error::Completion("mock completion failure".to_string()))
    }
}

/// Router plus handles onto the mock collaborators
pub struct TestHarness {
    pub pool: DbPool,
    pub state: Arc<ApiState>,
    pub router: Router,
    pub messenger: Arc<MockMessenger>,
    pub transcriber: Arc<MockTranscriber>,
    pub responder: Arc<MockResponder>,
}

pub fn harness(
    pool: DbPool,
    messenger: MockMessenger,
    transcriber: MockTranscriber,
    responder: MockResponder,
) -> TestHarness {
    let messenger = Arc::new(messenger);
    let transcriber = Arc::new(transcriber);
    let responder = Arc::new(responder);

    let state = Arc::new(ApiState {
        tenants: Arc::new(TenantRepo::new(pool.clone())),
        conversations: Arc::new(ConversationRepo::new(pool.clone())),
        messenger: messenger.clone(),
        transcriber: transcriber.clone(),
        responder: responder.clone(),
        history_limit: 10,
    });

    TestHarness {
        pool,
        state: state.clone(),
        router: api::router(state),
        messenger,
        transcriber,
        responder,
    }
}

/// Default harness: succeeding mocks over a seeded tenant
pub fn default_harness() -> TestHarness {
    let pool = setup_test_db();
    seed_tenant(&pool);
    harness(
        pool,
        MockMessenger::new(),
        MockTranscriber::ok("transcrição"),
        MockResponder::ok("Resposta gerada"),
    )
}

/// Webhook body for a plain text message
pub fn text_event(jid: &str, text: &str, from_me: bool) -> Value {
    json!({
        "event": "messages.upsert",
        "instance": INSTANCE,
        "data": {
            "key": {"remoteJid": jid, "fromMe": from_me, "id": "WAMID-1"},
            "pushName": "Maria",
            "message": {"conversation": text},
            "messageTimestamp": 1_700_000_000
        }
    })
}

/// Webhook body for an audio message
pub fn audio_event(jid: &str, media_id: &str) -> Value {
    json!({
        "event": "messages.upsert",
        "instance": INSTANCE,
        "data": {
            "key": {"remoteJid": jid, "fromMe": false, "id": media_id},
            "pushName": "Maria",
            "message": {"audioMessage": {"seconds": 4, "mimetype": "audio/ogg"}},
            "messageTimestamp": 1_700_000_000
        }
    })
}

/// POST a webhook body and decode the JSON acknowledgement
pub async fn post_webhook(router: Router, instance: &str, body: &Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/webhook/{instance}"))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, json)
}

/// All message rows as (direction, kind, body, transcription), insertion order
pub fn message_rows(pool: &DbPool) -> Vec<(String, String, String, Option<String>)> {
    let conn = pool.get().unwrap();
    let mut stmt = conn
        .prepare("SELECT direction, kind, body, transcription FROM messages ORDER BY rowid")
        .unwrap();
    stmt.query_map([], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    })
    .unwrap()
    .filter_map(std::result::Result::ok)
    .collect()
}
