//! Form flow and session pool behavior against an in-process fake WebDriver.
//!
//! The fake speaks just enough of the W3C protocol for the inquiry form:
//! sessions, navigation, CSS lookup, frame switching, typing, clicking and
//! element text. Each scenario scripts what the "site" renders.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use elections_adapter::webdriver::ELEMENT_KEY;
use elections_adapter::{
    AdapterError, BrowserConfig, ElectionsSite, FormConfig, PoolConfig, SessionPool,
    WebDriverClient,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use voter_lookup::prelude::*;
use voter_lookup::{NOT_REGISTERED_NOTICE, UNDERAGE_NOTICE};

const LOADING_TEXT: &str = "الاستعلام عن الناخبين - جاري التحميل";
const REGISTERED_TEXT: &str = "\
مركزك الإنتخابي: مدرسه التربيه الفكريه
القسم : قسم الشرق
العنوان : مساكن بلال بن رباح
رقم اللجنة الفرعية : ٢٠
رقمك في الكشوف الانتخابية : ٧٨٨١";

#[derive(Default)]
struct SiteState {
    has_iframe: bool,
    result_text: String,
    navigation_error: Option<&'static str>,
    /// Clicks left that never get an answer.
    hung_clicks: u32,
    in_frame: bool,
    submitted: bool,
    typed: String,
    created: u32,
    deleted: u32,
}

type Shared = Arc<Mutex<SiteState>>;
type Reply = (StatusCode, Json<Value>);

struct FakeDriver {
    state: Shared,
    url: String,
    task: tokio::task::JoinHandle<()>,
}

impl FakeDriver {
    async fn start(state: SiteState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(state));
        let app = router(Arc::clone(&state));
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            state,
            url: format!("http://{addr}/"),
            task,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut SiteState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

impl Drop for FakeDriver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/session", post(new_session))
        .route("/session/{session}", delete(delete_session))
        .route("/session/{session}/url", post(navigate))
        .route("/session/{session}/element", post(find_element))
        .route("/session/{session}/frame", post(switch_frame))
        .route(
            "/session/{session}/element/{element}/{command}",
            get(read_element).post(act_on_element),
        )
        .fallback(|| async { fail("unknown command") })
        .with_state(state)
}

fn ok(value: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "value": value })))
}

fn fail(error: &str) -> Reply {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "value": { "error": error, "message": format!("fake driver: {error}") } })),
    )
}

async fn status() -> Reply {
    ok(json!({ "ready": true, "message": "fake ready" }))
}

async fn new_session(State(state): State<Shared>, Json(_body): Json<Value>) -> Reply {
    let mut s = state.lock().unwrap();
    s.created += 1;
    ok(json!({ "sessionId": format!("s{}", s.created), "capabilities": {} }))
}

async fn delete_session(State(state): State<Shared>, Path(_session): Path<String>) -> Reply {
    state.lock().unwrap().deleted += 1;
    ok(Value::Null)
}

async fn navigate(State(state): State<Shared>, Path(_session): Path<String>) -> Reply {
    let mut s = state.lock().unwrap();
    if let Some(error) = s.navigation_error {
        return fail(error);
    }
    s.in_frame = false;
    s.submitted = false;
    ok(Value::Null)
}

async fn find_element(
    State(state): State<Shared>,
    Path(_session): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let s = state.lock().unwrap();
    let selector = body["value"].as_str().unwrap_or_default();
    let present = match selector {
        "#ocv_iframe_id" => s.has_iframe && !s.in_frame,
        "#nid" | "#submit_btn" => s.in_frame,
        "body" => true,
        _ => false,
    };
    if present {
        ok(json!({ ELEMENT_KEY: selector.trim_start_matches('#') }))
    } else {
        fail("no such element")
    }
}

async fn switch_frame(
    State(state): State<Shared>,
    Path(_session): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    state.lock().unwrap().in_frame = !body["id"].is_null();
    ok(Value::Null)
}

async fn read_element(
    State(state): State<Shared>,
    Path((_session, element, command)): Path<(String, String, String)>,
) -> Reply {
    let s = state.lock().unwrap();
    match (element.as_str(), command.as_str()) {
        (_, "enabled" | "displayed") => ok(json!(true)),
        ("body", "text") if s.submitted => ok(json!(s.result_text)),
        ("body", "text") => ok(json!(LOADING_TEXT)),
        _ => fail("unknown command"),
    }
}

async fn act_on_element(
    State(state): State<Shared>,
    Path((_session, element, command)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Reply {
    let hang = {
        let mut s = state.lock().unwrap();
        match (element.as_str(), command.as_str()) {
            ("nid", "clear") => s.typed.clear(),
            ("nid", "value") => {
                let text = body["text"].as_str().unwrap_or_default();
                s.typed.push_str(text);
            }
            ("submit_btn", "click") if s.hung_clicks > 0 => s.hung_clicks -= 1,
            ("submit_btn", "click") => s.submitted = true,
            _ => return fail("unknown command"),
        }
        element == "submit_btn" && !s.submitted
    };
    if hang {
        std::future::pending::<()>().await;
    }
    ok(Value::Null)
}

fn fast_form() -> FormConfig {
    FormConfig {
        settle_delay: Duration::ZERO,
        result_delay: Duration::ZERO,
        element_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(20),
        ..FormConfig::default()
    }
}

fn site(driver: &FakeDriver, pool: PoolConfig) -> ElectionsSite {
    let client = WebDriverClient::new(&driver.url, Duration::from_secs(5)).unwrap();
    let browser = BrowserConfig {
        isolated_profile: false,
        ..BrowserConfig::default()
    };
    ElectionsSite::with_pool(SessionPool::new(client, browser, pool), fast_form())
}

fn id() -> Identifier {
    validate("29710260300314").unwrap()
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..50 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

#[tokio::test]
async fn test_registered_result_is_extracted() {
    let driver = FakeDriver::start(SiteState {
        has_iframe: true,
        result_text: REGISTERED_TEXT.to_string(),
        ..SiteState::default()
    })
    .await;
    let site = site(&driver, PoolConfig::default());

    let outcome = site.attempt_lookup(&id()).await;

    match outcome {
        AttemptOutcome::Definitive {
            status: LookupStatus::Registered,
            record: Some(record),
        } => {
            assert_eq!(record.district, "قسم الشرق");
            assert_eq!(record.subcommittee_number, "20");
            assert_eq!(record.electoral_list_number, "7881");
        }
        other => panic!("expected a registered record, got {other:?}"),
    }
    assert_eq!(driver.with(|s| s.typed.clone()), "29710260300314");
    assert!(!driver.with(|s| s.in_frame), "should switch back to the top frame");
}

#[tokio::test]
async fn test_sessions_are_reused() {
    let driver = FakeDriver::start(SiteState {
        has_iframe: true,
        result_text: format!("نتيجة الاستعلام\n{NOT_REGISTERED_NOTICE}"),
        ..SiteState::default()
    })
    .await;
    let site = site(&driver, PoolConfig::default());

    for _ in 0..3 {
        let outcome = site.attempt_lookup(&id()).await;
        assert_eq!(outcome, AttemptOutcome::answer(LookupStatus::NotRegistered));
    }

    assert_eq!(driver.with(|s| s.created), 1);
    assert_eq!(site.pool().idle_count(), 1);
}

#[tokio::test]
async fn test_missing_iframe_is_transient() {
    let driver = FakeDriver::start(SiteState {
        has_iframe: false,
        ..SiteState::default()
    })
    .await;
    let site = site(&driver, PoolConfig::default());

    let outcome = site.attempt_lookup(&id()).await;

    assert_eq!(
        outcome,
        AttemptOutcome::transient("Could not find iframe - page structure may have changed")
    );
    assert_eq!(site.pool().idle_count(), 1, "a healthy session is kept");
}

#[tokio::test]
async fn test_dead_session_is_discarded() {
    let driver = FakeDriver::start(SiteState {
        has_iframe: true,
        navigation_error: Some("invalid session id"),
        ..SiteState::default()
    })
    .await;
    let site = site(&driver, PoolConfig::default());

    let outcome = site.attempt_lookup(&id()).await;

    match outcome {
        AttemptOutcome::Transient { reason } => {
            assert!(reason.starts_with("Navigation error: "), "reason: {reason}");
        }
        other => panic!("expected transient, got {other:?}"),
    }
    assert_eq!(site.pool().idle_count(), 0);
    assert!(eventually(|| driver.with(|s| s.deleted) == 1).await);
}

#[tokio::test]
async fn test_pool_exhaustion_times_out() {
    let driver = FakeDriver::start(SiteState::default()).await;
    let site = site(
        &driver,
        PoolConfig {
            size: 1,
            acquire_timeout: Duration::from_millis(50),
            ..PoolConfig::default()
        },
    );

    let held = site.pool().acquire().await.unwrap();
    let err = site.pool().acquire().await.unwrap_err();
    assert!(matches!(err, AdapterError::PoolExhausted(_)));

    drop(held);
    let again = site.pool().acquire().await.unwrap();
    assert_eq!(again.id(), "s1");
}

#[tokio::test]
async fn test_expired_sessions_are_replaced() {
    let driver = FakeDriver::start(SiteState::default()).await;
    let site = site(
        &driver,
        PoolConfig {
            session_ttl: Duration::ZERO,
            ..PoolConfig::default()
        },
    );

    drop(site.pool().acquire().await.unwrap());
    let second = site.pool().acquire().await.unwrap();

    assert_eq!(second.id(), "s2");
    assert!(eventually(|| driver.with(|s| s.deleted) == 1).await);
}

#[tokio::test]
async fn test_shutdown_closes_idle_sessions() {
    let driver = FakeDriver::start(SiteState::default()).await;
    let site = site(&driver, PoolConfig::default());

    drop(site.pool().acquire().await.unwrap());
    site.shutdown().await.unwrap();

    assert_eq!(driver.with(|s| s.deleted), 1);
    assert!(matches!(
        site.pool().acquire().await.unwrap_err(),
        AdapterError::PoolClosed
    ));
}

#[tokio::test]
async fn test_hung_session_is_not_reused_after_deadline() {
    let driver = FakeDriver::start(SiteState {
        has_iframe: true,
        result_text: REGISTERED_TEXT.to_string(),
        hung_clicks: 1,
        ..SiteState::default()
    })
    .await;
    let site = site(&driver, PoolConfig::default());
    let orchestrator = RetryingLookupOrchestrator::new().policy(RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::ZERO,
        attempt_timeout: Some(Duration::from_secs(2)),
    });

    let result = orchestrator.lookup(&id(), &site).await;

    assert_eq!(result.status(), Some(LookupStatus::Registered));
    assert_eq!(result.metrics().total_attempts, 2);
    assert_eq!(driver.with(|s| s.created), 2, "the retry needs a fresh browser");
    assert!(eventually(|| driver.with(|s| s.deleted) == 1).await);
    assert_eq!(site.pool().idle_count(), 1);
}

#[tokio::test]
async fn test_full_stack_underage_envelope() {
    let driver = FakeDriver::start(SiteState {
        has_iframe: true,
        result_text: format!("نتيجة الاستعلام\n{UNDERAGE_NOTICE}"),
        ..SiteState::default()
    })
    .await;
    let service = VoterLookup::new(
        RetryingLookupOrchestrator::new(),
        Arc::new(site(&driver, PoolConfig::default())),
    );

    let response = service.respond("29710260300314").await;
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["status"], "underage");
    assert_eq!(json["data"]["message"], UNDERAGE_NOTICE);
}
