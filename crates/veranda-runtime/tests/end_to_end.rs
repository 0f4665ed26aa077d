//! End-to-end webhook pipeline tests: signed callbacks in, handler
//! activity and outbound calls observed through a recording bot.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use veranda_core::{
    ApiError, ApiResult, Bot, BotIdentity, Dispatcher, Event, Message, MessageContent,
    MessageContentInfo, on_keyword, signing_payload,
};
use veranda_runtime::{BotRegistry, DispatchEngine, EngineOptions, WebhookOutcome};

const SECRET: &str = "secret123";

/// Records every outbound send.
struct RecordingBot {
    sent: std::sync::Mutex<Vec<(u64, u64, String)>>,
}

impl RecordingBot {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<(u64, u64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Bot for RecordingBot {
    fn id(&self) -> &str {
        "bot_e2e"
    }

    async fn send_message(
        &self,
        villa_id: u64,
        room_id: u64,
        _object_name: &str,
        msg_content: &MessageContentInfo,
    ) -> ApiResult<String> {
        let text = match &msg_content.content {
            MessageContent::Text(t) => t.text.clone(),
            other => format!("{other:?}"),
        };
        self.sent.lock().unwrap().push((villa_id, room_id, text));
        Ok("bot-msg-1".to_string())
    }

    async fn send(&self, event: &Event, message: Message) -> ApiResult<String> {
        let (villa_id, room_id) = event.reply_target().ok_or(ApiError::MissingSession)?;
        let info = message.to_content_info()?;
        self.send_message(villa_id, room_id, info.content.object_name(), &info)
            .await
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct Harness {
    engine: DispatchEngine,
    bot: Arc<RecordingBot>,
    invocations: Arc<AtomicUsize>,
    private_key: RsaPrivateKey,
}

impl Harness {
    /// One bot, one matcher: substring "hello" replies "world".
    fn new() -> Self {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let pub_pem = private_key
            .to_public_key()
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .expect("PEM encoding");

        let identity = Arc::new(BotIdentity::new("bot_e2e", SECRET, pub_pem, "/callback"));

        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(on_keyword(["hello"]).handler(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "world".to_string()
            }
        }));

        let bot = RecordingBot::new();
        let registry = Arc::new(BotRegistry::new());
        registry
            .register(identity, dispatcher, bot.clone())
            .expect("registration");

        let engine = DispatchEngine::new(
            registry,
            EngineOptions {
                wait_until_complete: true,
                dispatch_timeout: Duration::from_secs(5),
            },
        );

        Self {
            engine,
            bot,
            invocations,
            private_key,
        }
    }

    fn sign(&self, body: &str) -> String {
        let payload = signing_payload(body, SECRET);
        let digest = Sha256::digest(payload.as_bytes());
        let signature = self
            .private_key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .expect("signing");
        BASE64.encode(signature)
    }

    async fn deliver(&self, body: &str, sign: Option<&str>) -> WebhookOutcome {
        self.engine
            .handle_request("bot_e2e", sign, body.as_bytes())
            .await
    }
}

fn send_message_body(text: &str) -> String {
    callback_body(
        2,
        "SendMessage",
        json!({
            "content": { "content": { "text": text, "entities": [] } },
            "from_user_id": 42,
            "send_at": 1_690_000_001,
            "room_id": 7,
            "object_name": 1,
            "nickname": "Traveler",
            "msg_uid": "msg-1",
            "villa_id": 100,
            "bot_id": "bot_e2e"
        }),
    )
}

fn callback_body(event_type: i64, name: &str, data: Value) -> String {
    json!({
        "event": {
            "robot": {
                "villa_id": 100,
                "template": { "id": "bot_e2e", "name": "E2E", "icon": "" }
            },
            "type": event_type,
            "extend_data": { "EventData": { name: data } },
            "id": "event-1",
            "created_at": 1_690_000_000,
            "send_at": 1_690_000_001
        }
    })
    .to_string()
}

#[tokio::test]
async fn signed_message_triggers_handler_and_reply() {
    let harness = Harness::new();
    let body = send_message_body("@Bot hello");
    let signature = harness.sign(&body);

    let outcome = harness.deliver(&body, Some(&signature)).await;

    assert_eq!(outcome, WebhookOutcome::Dispatched);
    assert_eq!(outcome.http_status(), 200);
    assert_eq!(harness.invocations.load(Ordering::SeqCst), 1);

    let sent = harness.bot.sent();
    assert_eq!(sent.len(), 1);
    let (villa_id, room_id, text) = &sent[0];
    assert_eq!(*villa_id, 100);
    assert_eq!(*room_id, 7);
    assert_eq!(text, "world");
}

#[tokio::test]
async fn invalid_signature_rejects_without_side_effects() {
    let harness = Harness::new();
    let body = send_message_body("@Bot hello");

    // Sign a different body, then deliver the original.
    let wrong = harness.sign(&send_message_body("@Bot goodbye"));
    let outcome = harness.deliver(&body, Some(&wrong)).await;

    assert_eq!(outcome, WebhookOutcome::Rejected);
    assert_eq!(outcome.http_status(), 401);
    assert_eq!(harness.invocations.load(Ordering::SeqCst), 0);
    assert!(harness.bot.sent().is_empty());
}

#[tokio::test]
async fn missing_signature_rejects() {
    let harness = Harness::new();
    let body = send_message_body("@Bot hello");
    let outcome = harness.deliver(&body, None).await;
    assert_eq!(outcome, WebhookOutcome::Rejected);
    assert_eq!(harness.invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged_without_invocations() {
    let harness = Harness::new();
    let body = callback_body(88, "BrandNewEvent", json!({ "some": "payload" }));
    let signature = harness.sign(&body);

    let outcome = harness.deliver(&body, Some(&signature)).await;

    assert_eq!(outcome, WebhookOutcome::Dispatched);
    assert_eq!(outcome.http_status(), 200);
    assert_eq!(harness.invocations.load(Ordering::SeqCst), 0);
    assert!(harness.bot.sent().is_empty());
}

#[tokio::test]
async fn non_matching_message_is_acknowledged_without_invocations() {
    let harness = Harness::new();
    let body = send_message_body("nothing relevant");
    let signature = harness.sign(&body);

    let outcome = harness.deliver(&body, Some(&signature)).await;

    assert_eq!(outcome, WebhookOutcome::Dispatched);
    assert_eq!(harness.invocations.load(Ordering::SeqCst), 0);
    assert!(harness.bot.sent().is_empty());
}
