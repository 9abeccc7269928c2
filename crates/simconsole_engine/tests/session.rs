use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use simconsole_core::{CloseReason, DetailPhase, DetailState, StreamStatus};
use simconsole_engine::{
    ClientSettings, DetailEvent, DetailSession, DetailSink, ReqwestBackend, SimulationService,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(console_logging::initialize_for_tests);
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<DetailEvent>>,
}

impl RecordingSink {
    fn records(&self) -> Vec<serde_json::Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                DetailEvent::Record(record) => Some(record.to_json()),
                _ => None,
            })
            .collect()
    }

    fn navigated(&self) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|event| matches!(event, DetailEvent::NavigateToList))
    }

    fn views(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, DetailEvent::View(_)))
            .count()
    }
}

impl DetailSink for RecordingSink {
    fn emit(&self, event: DetailEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn session(server: &MockServer, poll: Option<Duration>) -> DetailSession {
    reconnecting_session(server, poll, None)
}

fn reconnecting_session(
    server: &MockServer,
    poll: Option<Duration>,
    stream_retry: Option<Duration>,
) -> DetailSession {
    init_logging();
    let settings = ClientSettings {
        base_url: server.uri(),
        stream_retry,
        state_poll_interval: poll,
        ..ClientSettings::default()
    };
    let backend = ReqwestBackend::new(settings.clone()).expect("valid base url");
    let service = Arc::new(SimulationService::new(Arc::new(backend)));
    DetailSession::new(service, &settings)
}

async fn mount_state(server: &MockServer, state: &str) {
    Mock::given(method("GET"))
        .and(path("/simulation/state/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s1", "name": "Harbor", "state": state
        })))
        .mount(server)
        .await;
}

async fn run(session: &DetailSession, sink: &RecordingSink, cancel: CancellationToken) -> DetailState {
    tokio::time::timeout(Duration::from_secs(3), session.run("s1", sink, cancel))
        .await
        .expect("session finishes")
}

#[tokio::test]
async fn running_simulation_streams_until_the_server_ends() {
    let server = MockServer::start().await;
    mount_state(&server, "RUNNING").await;
    Mock::given(method("GET"))
        .and(path("/simulation/logs/s1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {step=1}\n\ndata: {\"step\":2}\n\n", "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let state = run(&session(&server, None), &sink, CancellationToken::new()).await;

    assert_eq!(state.phase(), DetailPhase::Active);
    assert_eq!(state.stream(), &StreamStatus::Closed(CloseReason::Ended));
    assert_eq!(state.simulation().map(|s| s.name.as_str()), Some("harbor"));
    assert_eq!(state.records().len(), 2);
    assert_eq!(sink.records(), vec![json!({"step": 1}), json!({"step": 2})]);
    assert!(sink.views() >= 1);
    assert!(!sink.navigated());
}

#[tokio::test]
async fn stopped_simulation_never_opens_the_stream() {
    let server = MockServer::start().await;
    mount_state(&server, "STOPPED").await;
    Mock::given(method("GET"))
        .and(path("/simulation/logs/s1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let state = run(&session(&server, None), &sink, CancellationToken::new()).await;

    assert_eq!(state.phase(), DetailPhase::Active);
    assert_eq!(state.stream(), &StreamStatus::Idle);
    assert!(state.is_stopped());
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn missing_simulation_navigates_to_the_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simulation/state/s1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let state = run(&session(&server, None), &sink, CancellationToken::new()).await;

    assert_eq!(state.phase(), DetailPhase::NotFound);
    assert!(sink.navigated());
}

#[tokio::test]
async fn polling_picks_up_a_stop_and_closes_the_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simulation/state/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s1", "name": "Harbor", "state": "RUNNING"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_state(&server, "STOPPED").await;
    Mock::given(method("GET"))
        .and(path("/simulation/logs/s1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {step=1}\n\n", "text/event-stream")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let state = run(
        &session(&server, Some(Duration::from_millis(50))),
        &sink,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(state.stream(), &StreamStatus::Closed(CloseReason::Stopped));
    assert!(state.is_stopped());
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn busy_stream_does_not_hold_back_a_slow_state_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simulation/state/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s1", "name": "Harbor", "state": "RUNNING"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/simulation/state/s1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "s1", "name": "Harbor", "state": "STOPPED"}))
                .set_delay(Duration::from_millis(40)),
        )
        .mount(&server)
        .await;
    let body: String = (0..300).map(|n| format!("data: {{n={n}}}\n\n")).collect();
    Mock::given(method("GET"))
        .and(path("/simulation/logs/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let state = run(
        &reconnecting_session(
            &server,
            Some(Duration::from_millis(20)),
            Some(Duration::from_millis(5)),
        ),
        &sink,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(state.stream(), &StreamStatus::Closed(CloseReason::Stopped));
    assert!(state.is_stopped());
    assert_eq!(sink.records().len(), state.records().len());
}

#[tokio::test]
async fn cancelling_closes_the_view_and_the_stream() {
    let server = MockServer::start().await;
    mount_state(&server, "RUNNING").await;
    Mock::given(method("GET"))
        .and(path("/simulation/logs/s1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {step=1}\n\n", "text/event-stream")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let sink = RecordingSink::default();
    let state = run(&session(&server, None), &sink, cancel).await;

    assert_eq!(state.phase(), DetailPhase::Closed);
    assert!(!state.is_stream_open());
    assert!(sink.records().is_empty());
}
