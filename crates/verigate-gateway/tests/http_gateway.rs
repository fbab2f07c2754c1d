use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use jiff::{SignedDuration, Timestamp};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use verigate_core::error::Result as StoreResult;
use verigate_core::{
    ManualClock, RecordStore, RedirectId, RedirectRecord, UserId, VerificationRecord,
};
use verigate_gateway::{
    App, AppState, GatewayConfig, RateLimitSettings, RateLimiter, RedirectGateway,
};
use verigate_shortlink::{AttemptError, ResolverSettings, ShortenerClient, ShortlinkResolver};
use verigate_storage::InMemoryRecordStore;

const TOKEN: &str = "AbCdEfGh12345678";
const SHORT: &str = "https://short.example/xyz";

#[derive(Default)]
struct StubShortener {
    calls: AtomicUsize,
}

#[async_trait]
impl ShortenerClient for StubShortener {
    async fn shorten(&self, _long_url: &str) -> Result<String, AttemptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SHORT.to_string())
    }

    async fn follow(&self, url: &str) -> Result<String, AttemptError> {
        Ok(url.to_string())
    }
}

/// A store whose every call never completes.
struct StalledStore;

#[async_trait]
impl RecordStore for StalledStore {
    async fn get_verification(&self, _user_id: UserId) -> StoreResult<Option<VerificationRecord>> {
        std::future::pending().await
    }

    async fn get_redirect(&self, _redirect_id: &RedirectId) -> StoreResult<Option<RedirectRecord>> {
        std::future::pending().await
    }

    async fn create_redirect(&self, _record: RedirectRecord) -> StoreResult<()> {
        std::future::pending().await
    }

    async fn mark_visited(&self, _redirect_id: &RedirectId) -> StoreResult<()> {
        std::future::pending().await
    }

    async fn health_check(&self) -> StoreResult<()> {
        std::future::pending().await
    }
}

struct TestApp {
    router: Router,
    store: Arc<InMemoryRecordStore>,
    shortener: Arc<StubShortener>,
    clock: ManualClock,
}

fn now() -> Timestamp {
    Timestamp::from_second(1_700_000_000).unwrap()
}

fn test_app(config: GatewayConfig, with_shortener: bool) -> TestApp {
    let store = Arc::new(InMemoryRecordStore::new());
    let shortener = Arc::new(StubShortener::default());
    let clock = ManualClock::new(now());
    let resolver = with_shortener
        .then(|| ShortlinkResolver::new(shortener.clone(), ResolverSettings::builder().build()));
    let gateway =
        RedirectGateway::with_clock(store.clone(), resolver, config, Arc::new(clock.clone()));
    let limiter = RateLimiter::with_clock(RateLimitSettings::default(), Arc::new(clock.clone()));

    TestApp {
        router: App::router(AppState::new(gateway, limiter)),
        store,
        shortener,
        clock,
    }
}

fn default_app() -> TestApp {
    test_app(
        GatewayConfig::builder().bot_username("VerigateBot").build(),
        true,
    )
}

fn pending_record(user_id: u64) -> VerificationRecord {
    VerificationRecord {
        user_id: UserId::new(user_id).unwrap(),
        page_token: TOKEN.to_string(),
        verify_token: Some("tok123".to_string()),
        is_verified: false,
        created_at: now(),
        verified_time: None,
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    get_from(router, uri, "198.51.100.1").await
}

async fn get_from(router: &Router, uri: &str, client: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn entry_serves_redirect_page_to_shortlink() {
    let app = default_app();
    app.store.put_verification(pending_record(42));

    let (status, body) = get(&app.router, &format!("/telegram/42/{TOKEN}")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("url=https://short.example/xyz"));
    assert!(!body.contains("tok123"));
    assert_eq!(app.store.redirect_count(), 1);
    assert_eq!(app.shortener.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verify_query_alias_uses_same_flow() {
    let app = default_app();
    app.store.put_verification(pending_record(42));

    let (status, body) = get(&app.router, &format!("/verify?user_id=42&token={TOKEN}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(SHORT));

    let (status, _) = get(&app.router, "/verify").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app.router, "/verify?user_id=42").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.shortener.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stalled_store_yields_service_unavailable() {
    let resolver = ShortlinkResolver::new(
        Arc::new(StubShortener::default()),
        ResolverSettings::builder().build(),
    );
    let gateway = RedirectGateway::new(
        Arc::new(StalledStore),
        Some(resolver),
        GatewayConfig::builder()
            .bot_username("VerigateBot")
            .store_timeout(Duration::from_millis(50))
            .build(),
    );
    let router = App::router(AppState::new(
        gateway,
        RateLimiter::new(RateLimitSettings::default()),
    ));

    let (status, _) = get(&router, &format!("/telegram/42/{TOKEN}")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = get(&router, "/redirect?id=abc").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains(r#""status":"unhealthy""#));

    let (status, _) = get(&router, "/mark-visited?id=abc").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_token_is_not_found() {
    let app = default_app();
    app.store.put_verification(pending_record(42));

    let (status, body) = get(&app.router, "/telegram/42/WRONG0000000000").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("invalid or expired"));
    assert_eq!(app.store.redirect_count(), 0);
    assert_eq!(app.shortener.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_user_id_is_bad_request() {
    let app = default_app();
    let (status, _) = get(&app.router, &format!("/telegram/abc/{TOKEN}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verified_subject_sees_verified_page() {
    let app = default_app();
    let mut record = pending_record(42);
    record.created_at = now() - SignedDuration::from_hours(10);
    record.is_verified = true;
    app.store.put_verification(record);

    let (status, body) = get(&app.router, &format!("/telegram/42/{TOKEN}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Already verified"));
}

#[tokio::test]
async fn expired_session_is_gone() {
    let app = default_app();
    app.store.put_verification(pending_record(42));
    app.clock.advance(SignedDuration::from_secs(301));

    let (status, _) = get(&app.router, &format!("/telegram/42/{TOKEN}")).await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn sixty_first_entry_request_is_rate_limited() {
    let app = default_app();
    let uri = format!("/telegram/42/{TOKEN}");

    for i in 0..60 {
        let (status, _) = get_from(&app.router, &uri, "203.0.113.9").await;
        assert_eq!(status, StatusCode::NOT_FOUND, "request {}", i + 1);
    }

    let request = Request::builder()
        .uri(&uri)
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let (status, _) = get_from(&app.router, &uri, "203.0.113.10").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_from(&app.router, "/health", "203.0.113.9").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn redirect_resumes_and_marks_visited() {
    let app = default_app();
    app.store.put_verification(pending_record(42));
    get(&app.router, &format!("/telegram/42/{TOKEN}")).await;
    let record = app
        .store
        .redirects_for(UserId::new(42).unwrap())
        .pop()
        .unwrap();

    let (status, body) = get(&app.router, &format!("/redirect?id={}", record.redirect_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(SHORT));

    let stored = app
        .store
        .get_redirect(&record.redirect_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.visited);
}

#[tokio::test]
async fn redirect_requires_known_live_id() {
    let app = default_app();
    app.store.put_verification(pending_record(42));
    get(&app.router, &format!("/telegram/42/{TOKEN}")).await;
    let record = app
        .store
        .redirects_for(UserId::new(42).unwrap())
        .pop()
        .unwrap();

    let (status, _) = get(&app.router, "/redirect").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app.router, "/redirect?id=unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.clock.advance(SignedDuration::from_secs(121));
    let (status, _) = get(&app.router, &format!("/redirect?id={}", record.redirect_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mark_visited_always_answers_ok() {
    let app = default_app();
    app.store.put_verification(pending_record(42));
    get(&app.router, &format!("/telegram/42/{TOKEN}")).await;
    let redirect_id: RedirectId = app
        .store
        .redirects_for(UserId::new(42).unwrap())
        .pop()
        .unwrap()
        .redirect_id;

    for uri in [
        format!("/mark-visited?id={redirect_id}"),
        format!("/mark-visited?id={redirect_id}"),
        "/mark-visited?id=unknown".to_string(),
        "/mark-visited".to_string(),
    ] {
        let (status, body) = get(&app.router, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    let stored = app.store.get_redirect(&redirect_id).await.unwrap().unwrap();
    assert!(stored.visited);
}

#[tokio::test]
async fn health_and_banner() {
    let app = default_app();

    let (status, body) = get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"healthy""#));

    let (status, body) = get(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("verigate"));
}

#[tokio::test]
async fn misconfiguration_degrades_verification_to_500() {
    let app = test_app(
        GatewayConfig::builder().bot_username("VerigateBot").build(),
        false,
    );
    app.store.put_verification(pending_record(42));

    let (status, _) = get(&app.router, &format!("/telegram/42/{TOKEN}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn debug_toggle_attaches_masked_diagnostics() {
    let app = test_app(
        GatewayConfig::builder()
            .bot_username("VerigateBot")
            .debug(true)
            .build(),
        true,
    );
    app.store.put_verification(pending_record(42));

    let (_, body) = get(&app.router, &format!("/telegram/42/{TOKEN}")).await;
    assert!(body.contains("diagnostics"));
    assert!(body.contains("REDIRECTING"));
    assert!(!body.contains(TOKEN));
    assert!(!body.contains("tok123"));

    let (_, body) = get(&app.router, "/telegram/42/WRONG0000000000").await;
    assert!(body.contains("REJECTED"));

    let quiet = default_app();
    let (_, body) = get(&quiet.router, "/telegram/42/WRONG0000000000").await;
    assert!(!body.contains("diagnostics"));
}
