//! Integration tests for message routing across origins.
//!
//! These tests wire the real hub, router and platform adapters together:
//! 1. Web messages are answered through the hub, targeted by session
//! 2. Signed webhook messages are answered through the partner callback
//! 3. Router lifecycle (start, stats, stop) governs adapter intake

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use secrecy::Secret;
use tokio::sync::mpsc;
use tokio::time::timeout;

use helpdesk_fabric::adapters::ai::MockAIProvider;
use helpdesk_fabric::adapters::archive::InMemoryMessageArchive;
use helpdesk_fabric::adapters::knowledge::{InMemoryKnowledgeIndex, MockKnowledgeClient};
use helpdesk_fabric::adapters::platforms::{
    sign_payload, WebhookChatAdapter, WebhookConfig, SIGNATURE_HEADER,
};
use helpdesk_fabric::adapters::resilience::InMemoryCircuitBreaker;
use helpdesk_fabric::adapters::websocket::{Connection, ConnectionHub, HubHandle, ServerMessage, WebAdapter};
use helpdesk_fabric::application::query::{EnhancedQueryService, EnhancedSettings};
use helpdesk_fabric::application::routing::{MessageRouter, RouterConfig};
use helpdesk_fabric::domain::foundation::{SessionId, UserId};
use helpdesk_fabric::domain::knowledge::QueryMetrics;
use helpdesk_fabric::domain::messaging::{PlatformType, UnifiedMessage};
use helpdesk_fabric::ports::{MessageArchive, PlatformAdapter, QueryService, RemoteKnowledgeClient};

// =============================================================================
// Test Infrastructure
// =============================================================================

const SECRET: &str = "partner-signing-secret";

fn query_service() -> Arc<dyn QueryService> {
    Arc::new(EnhancedQueryService::new(
        Arc::new(MockAIProvider::new()),
        Some(Arc::new(MockKnowledgeClient::new()) as Arc<dyn RemoteKnowledgeClient>),
        Arc::new(InMemoryCircuitBreaker::with_defaults("knowledge")),
        Arc::new(InMemoryKnowledgeIndex::with_builtin_faq(0.1)),
        Arc::new(QueryMetrics::new()),
        EnhancedSettings::default(),
    ))
}

struct Fabric {
    hub: HubHandle,
    router: MessageRouter,
    web: Arc<WebAdapter>,
    archive: Arc<InMemoryMessageArchive>,
}

async fn fabric() -> Fabric {
    let (hub, _task) = ConnectionHub::spawn();
    let archive = Arc::new(InMemoryMessageArchive::default());
    let router = MessageRouter::with_config(
        query_service(),
        hub.clone(),
        Some(archive.clone() as Arc<dyn MessageArchive>),
        RouterConfig::default(),
    );
    let web = Arc::new(WebAdapter::new(hub.clone()));
    router.register_adapter("web", web.clone()).await.unwrap();
    Fabric {
        hub,
        router,
        web,
        archive,
    }
}

fn connect(hub: &HubHandle, session: &str) -> mpsc::Receiver<ServerMessage> {
    let (conn, rx) = Connection::new(SessionId::new(session).unwrap(), 16);
    hub.register(conn);
    rx
}

fn web_message(session: &str, text: &str) -> UnifiedMessage {
    UnifiedMessage::text(
        PlatformType::Web,
        SessionId::new(session).unwrap(),
        UserId::new(session).unwrap(),
        text,
    )
}

async fn next_frame(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no frame within 2s")
        .expect("connection queue closed")
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<(String, Vec<u8>)>>>);

async fn capture(State(captured): State<Captured>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let sig = headers[SIGNATURE_HEADER].to_str().unwrap().to_string();
    captured.0.lock().unwrap().push((sig, body.to_vec()));
    StatusCode::OK
}

/// Starts a partner callback endpoint and returns its URL.
async fn callback_server(captured: Captured) -> String {
    let app = axum::Router::new()
        .route("/callback", axum::routing::post(capture))
        .with_state(captured);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}/callback", addr)
}

// =============================================================================
// Web origin
// =============================================================================

#[tokio::test]
async fn web_message_is_answered_on_its_session_only() {
    let f = fabric().await;
    let mut mine = connect(&f.hub, "web-1");
    let mut mine_too = connect(&f.hub, "web-1");
    let mut other = connect(&f.hub, "web-2");
    f.router.start().await.unwrap();

    f.web.accept(web_message("web-1", "介绍一下服务")).unwrap();

    for rx in [&mut mine, &mut mine_too] {
        match next_frame(rx).await {
            ServerMessage::Answer(answer) => {
                assert_eq!(answer.strategy, "fallback");
                assert!(!answer.content.is_empty());
            }
            other => panic!("expected answer frame, got {:?}", other),
        }
    }
    assert!(
        timeout(Duration::from_millis(100), other.recv()).await.is_err(),
        "other sessions must not receive the answer"
    );

    f.router.stop().await;
}

#[tokio::test]
async fn transfer_request_from_web_is_answered_with_transfer_frame() {
    let f = fabric().await;
    let mut rx = connect(&f.hub, "web-1");
    f.router.start().await.unwrap();

    f.web.accept(web_message("web-1", "请帮我转人工客服")).unwrap();

    match next_frame(&mut rx).await {
        ServerMessage::Answer(answer) => {
            assert_eq!(answer.strategy, "transfer");
            assert_eq!(answer.confidence, 1.0);
        }
        other => panic!("expected answer frame, got {:?}", other),
    }
    f.router.stop().await;
}

#[tokio::test]
async fn inbound_messages_are_archived() {
    let f = fabric().await;
    let mut rx = connect(&f.hub, "web-1");
    f.router.start().await.unwrap();

    f.web.accept(web_message("web-1", "hello")).unwrap();
    next_frame(&mut rx).await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while f.archive.is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let recorded = f.archive.for_session(&SessionId::new("web-1").unwrap());
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].content(), "hello");

    f.router.stop().await;
}

// =============================================================================
// Webhook origin
// =============================================================================

#[tokio::test]
async fn signed_webhook_message_is_answered_through_callback() {
    let f = fabric().await;
    let captured = Captured::default();
    let callback_url = callback_server(captured.clone()).await;

    let partner = Arc::new(
        WebhookChatAdapter::new(WebhookConfig::new(
            "partner",
            callback_url,
            Secret::new(SECRET.to_string()),
        ))
        .unwrap(),
    );
    f.router
        .register_adapter("partner", partner.clone())
        .await
        .unwrap();
    f.router.start().await.unwrap();

    let body = br#"{"session_id":"partner:42","user_id":"42","content":"how do refunds work"}"#;
    let signature = sign_payload(SECRET.as_bytes(), body).unwrap();
    partner.handle_inbound(body, Some(&signature)).unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while captured.0.lock().unwrap().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (sig, payload) = captured.0.lock().unwrap()[0].clone();
    let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(json["target"], "42");
    assert!(!json["content"].as_str().unwrap().is_empty());
    assert!(partner.verify_signature(&payload, &sig).is_ok());

    f.router.stop().await;
}

#[tokio::test]
async fn unsigned_webhook_message_never_reaches_the_router() {
    let f = fabric().await;
    let partner = Arc::new(
        WebhookChatAdapter::new(WebhookConfig::new(
            "partner",
            "http://127.0.0.1:9/unused",
            Secret::new(SECRET.to_string()),
        ))
        .unwrap(),
    );
    f.router.register_adapter("partner", partner.clone()).await.unwrap();
    f.router.start().await.unwrap();

    let body = br#"{"session_id":"partner:42","user_id":"42","content":"hi"}"#;
    assert!(partner.handle_inbound(body, None).is_err());
    assert!(partner.handle_inbound(body, Some("deadbeef")).is_err());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(f.archive.is_empty());

    f.router.stop().await;
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn stats_reflect_registered_adapters_and_running_flag() {
    let f = fabric().await;
    let partner = Arc::new(
        WebhookChatAdapter::new(WebhookConfig::new(
            "partner",
            "http://127.0.0.1:9/unused",
            Secret::new(SECRET.to_string()),
        ))
        .unwrap(),
    );
    f.router.register_adapter("partner", partner).await.unwrap();

    let stats = f.router.stats().await;
    assert!(!stats.running);
    let ids: Vec<_> = stats.adapters.iter().map(|a| (a.id.as_str(), a.platform)).collect();
    assert_eq!(ids, [("partner", PlatformType::Webhook), ("web", PlatformType::Web)]);

    f.router.start().await.unwrap();
    assert!(f.router.stats().await.running);

    f.router.stop().await;
    assert!(!f.router.stats().await.running);
}

#[tokio::test]
async fn stopped_router_refuses_web_intake() {
    let f = fabric().await;
    f.router.start().await.unwrap();
    assert!(f.web.is_running());

    f.router.stop().await;
    assert!(!f.web.is_running());
    assert!(f.web.accept(web_message("web-1", "hello")).is_err());
    assert_eq!(f.web.platform_type(), PlatformType::Web);
}
