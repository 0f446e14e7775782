//! Integration tests using wiremock to simulate the called services.

use interlink::sleeper::TrackingSleeper;
use interlink::{
    BackoffKind, CommandHost, DefaultHost, Error, Executor, JsonQueryCommand, ProblemReason,
    RequestSpec, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
}

fn test_data() -> TestData {
    TestData {
        id: 1,
        name: "Test".to_string(),
    }
}

fn executor(sleeper: &TrackingSleeper) -> Executor {
    Executor::builder()
        .sleeper(sleeper.clone())
        .build()
        .unwrap()
}

fn get(server: &MockServer, route: &str) -> RequestSpec {
    RequestSpec::parse_get(format!("{}{}", server.uri(), route)).unwrap()
}

/// A policy whose hook records the retry numbers it is called with.
fn recording_policy(max_retries: usize, kind: BackoffKind) -> (RetryPolicy, Arc<Mutex<Vec<usize>>>) {
    let retries = Arc::new(Mutex::new(Vec::new()));
    let retries_clone = retries.clone();
    let policy = RetryPolicy::new(max_retries, kind)
        .on_each_retry(move |retry| retries_clone.lock().unwrap().push(retry));
    (policy, retries)
}

/// A URL nothing listens on.
fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/unreachable", port)
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sleeper = TrackingSleeper::new();
    let (policy, retries) = recording_policy(3, BackoffKind::Linear);

    let response = executor(&sleeper)
        .execute::<TestData>(&get(&mock_server, "/test"), &policy)
        .await
        .unwrap();

    assert_eq!(response.data, test_data());
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());
    assert!(sleeper.calls().is_empty());
    assert!(retries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_fields_are_ignored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"id":1,"name":"Test","addedInV2":{"nested":true},"tags":["a"]}"#,
        ))
        .mount(&mock_server)
        .await;

    let response = executor(&TrackingSleeper::new())
        .execute::<TestData>(&get(&mock_server, "/test"), &RetryPolicy::none())
        .await
        .unwrap();

    assert_eq!(response.data, test_data());
    assert!(response.raw_body.contains("addedInV2"));
}

#[tokio::test]
async fn test_post_sends_body_and_content_length() {
    let mock_server = MockServer::start().await;

    // "grüße" is 5 characters but 7 UTF-8 bytes
    Mock::given(method("POST"))
        .and(path("/greetings"))
        .and(header("content-length", "7"))
        .and(header("x-caller", "tests"))
        .and(body_string("grüße"))
        .respond_with(ResponseTemplate::new(201).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/greetings", mock_server.uri()).parse().unwrap();
    let spec = RequestSpec::post(url, "grüße")
        .with_header("X-Caller", "tests")
        .unwrap();

    let response = executor(&TrackingSleeper::new())
        .execute::<TestData>(&spec, &RetryPolicy::none())
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.data, test_data());
}

#[tokio::test]
async fn test_post_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(body_string(r#"{"id":0,"name":"New"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/users", mock_server.uri()).parse().unwrap();
    let payload = TestData {
        id: 0,
        name: "New".to_string(),
    };
    let spec = RequestSpec::post_json(url, &payload).unwrap();

    let response = executor(&TrackingSleeper::new())
        .execute::<TestData>(&spec, &RetryPolicy::none())
        .await
        .unwrap();

    assert_eq!(response.data.id, 1);
}

#[tokio::test]
async fn test_server_unable_on_501() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/501"))
        .respond_with(ResponseTemplate::new(501).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let spec = get(&mock_server, "/501");
    let result = executor(&TrackingSleeper::new())
        .execute::<TestData>(&spec, &RetryPolicy::none())
        .await;

    match result {
        Err(Error::Api(err)) => {
            assert_eq!(err.reason(), ProblemReason::ServerUnable);
            assert!(!err.is_unexpected());
            assert_eq!(err.status(), Some(501));
            assert_eq!(err.server_body(), Some("maintenance"));
            assert!(err.message().ends_with("maintenance"));
            assert!(err.message().contains(spec.url().as_str()));
            assert_eq!(err.url(), spec.url().as_str());
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_classified_status_codes() {
    let mock_server = MockServer::start().await;

    for (status, body) in [(400u16, "Bad Request"), (500, "Internal Server Error"), (503, "busy")] {
        Mock::given(method("GET"))
            .and(path(format!("/{}", status)))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
    }

    let executor = executor(&TrackingSleeper::new());
    let cases = [
        (400u16, ProblemReason::ClientMistake, "Bad Request"),
        (500, ProblemReason::ServerError, "Internal Server Error"),
        // Unclassified statuses fall through to CONNECTION_IMPOSSIBLE
        (503, ProblemReason::ConnectionImpossible, "busy"),
    ];

    for (status, reason, body) in cases {
        let spec = get(&mock_server, &format!("/{}", status));
        let err = executor
            .execute::<TestData>(&spec, &RetryPolicy::none())
            .await
            .unwrap_err();

        assert_eq!(err.problem_reason(), Some(reason), "status {}", status);
        assert!(err.is_unexpected());
        assert_eq!(err.status(), Some(status));
        assert!(err.to_string().ends_with(body));
        assert!(err.to_string().contains(&format!("/{}", status)));
    }
}

#[tokio::test]
async fn test_retry_then_success() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First two requests fail with 500, third succeeds
    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(500).set_body_string("Server error")
            } else {
                ResponseTemplate::new(200).set_body_json(test_data())
            }
        })
        .mount(&mock_server)
        .await;

    let sleeper = TrackingSleeper::new();
    let (policy, retries) = recording_policy(3, BackoffKind::Linear);

    let response = executor(&sleeper)
        .execute::<TestData>(&get(&mock_server, "/test"), &policy)
        .await
        .unwrap();

    assert_eq!(response.data, test_data());
    assert_eq!(response.attempts, 3);
    assert!(response.was_retried());
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.calls(), vec![Duration::from_millis(500); 2]);
    assert_eq!(*retries.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_connection_refused_exhausts_retries() {
    let url = refused_url();
    let spec = RequestSpec::parse_get(&url).unwrap();
    let sleeper = TrackingSleeper::new();
    let (policy, retries) = recording_policy(2, BackoffKind::Linear);

    let result = executor(&sleeper).execute::<TestData>(&spec, &policy).await;

    match result {
        Err(Error::Api(err)) => {
            assert_eq!(err.reason(), ProblemReason::ConnectionImpossible);
            assert!(err.is_unexpected());
            assert_eq!(err.status(), None);
            assert!(err.message().contains(&url));
        }
        other => panic!("Expected Api error, got {:?}", other),
    }

    // 3 attempts: 2 retries, each preceded by the hook and a 500ms wait
    assert_eq!(sleeper.calls(), vec![Duration::from_millis(500); 2]);
    assert_eq!(*retries.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_unsupported_scheme_is_not_retried() {
    let url = url::Url::parse("ftp://example.test/file").unwrap();
    let spec = RequestSpec::get(url);
    let sleeper = TrackingSleeper::new();
    let (policy, retries) = recording_policy(2, BackoffKind::Linear);

    let result = executor(&sleeper).execute::<TestData>(&spec, &policy).await;

    match result {
        Err(Error::ConfigurationError(message)) => {
            assert!(message.contains("ftp://example.test/file"));
        }
        other => panic!("Expected ConfigurationError, got {:?}", other),
    }
    assert!(sleeper.calls().is_empty());
    assert!(retries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_exponential_backoff_delays() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let sleeper = TrackingSleeper::new();
    let policy = RetryPolicy::new(3, BackoffKind::Exponential);

    let err = executor(&sleeper)
        .execute::<TestData>(&get(&mock_server, "/test"), &policy)
        .await
        .unwrap_err();

    assert_eq!(err.problem_reason(), Some(ProblemReason::ServerError));
    assert_eq!(
        sleeper.calls(),
        vec![
            Duration::from_millis(500),
            Duration::from_millis(1000),
            Duration::from_millis(2000),
        ]
    );
}

#[tokio::test]
async fn test_zero_retries_tries_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sleeper = TrackingSleeper::new();
    let err = executor(&sleeper)
        .execute::<TestData>(&get(&mock_server, "/test"), &RetryPolicy::none())
        .await
        .unwrap_err();

    assert_eq!(err.problem_reason(), Some(ProblemReason::ServerError));
    assert_eq!(err.raw_response(), Some(""));
    assert!(sleeper.calls().is_empty());
}

#[tokio::test]
async fn test_deserialization_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sleeper = TrackingSleeper::new();
    let policy = RetryPolicy::new(3, BackoffKind::Linear);
    let result = executor(&sleeper)
        .execute::<TestData>(&get(&mock_server, "/test"), &policy)
        .await;

    match result {
        Err(Error::DeserializationFailed {
            url,
            raw_response,
            serde_error,
        }) => {
            assert!(url.ends_with("/test"));
            assert_eq!(raw_response, "invalid json");
            assert!(serde_error.contains("expected"));
        }
        other => panic!("Expected DeserializationFailed, got {:?}", other),
    }
    assert!(sleeper.calls().is_empty());
}

#[tokio::test]
async fn test_custom_decoder() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/count"))
        .respond_with(ResponseTemplate::new(200).set_body_string("42"))
        .mount(&mock_server)
        .await;

    let response = executor(&TrackingSleeper::new())
        .execute_with(&get(&mock_server, "/count"), &RetryPolicy::none(), |body| {
            std::str::from_utf8(body)
                .map_err(|e| e.to_string())
                .and_then(|text| text.parse::<u32>().map_err(|e| e.to_string()))
        })
        .await
        .unwrap();

    assert_eq!(response.data, 42);
}

#[tokio::test]
async fn test_spec_headers_override_default_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .and(header("user-agent", "tests/1.0"))
        .and(header("x-tenant", "override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let executor = Executor::builder()
        .user_agent("tests/1.0")
        .unwrap()
        .default_header("X-Tenant", "default")
        .unwrap()
        .build()
        .unwrap();

    let spec = get(&mock_server, "/test")
        .with_header("x-tenant", "override")
        .unwrap();

    executor
        .execute::<TestData>(&spec, &RetryPolicy::none())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_command_returns_decoded_value() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .mount(&mock_server)
        .await;

    let command = JsonQueryCommand::<TestData>::microservice("getTest", get(&mock_server, "/test"))
        .caching(true);

    let data = command
        .execute(&executor(&TrackingSleeper::new()), &DefaultHost::with_caching_context())
        .await
        .unwrap();

    assert_eq!(data, test_data());
}

#[tokio::test]
async fn test_command_timeout_spans_all_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(test_data())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let command = JsonQueryCommand::<TestData>::new("slow", "tests", get(&mock_server, "/slow"))
        .retry_policy(RetryPolicy::new(5, BackoffKind::Linear))
        .timeout(Duration::from_millis(50));

    let result = command
        .execute(&executor(&TrackingSleeper::new()), &DefaultHost::new())
        .await;

    match result {
        Err(Error::Timeout {
            command, timeout, ..
        }) => {
            assert_eq!(command, "slow");
            assert_eq!(timeout, Duration::from_millis(50));
        }
        other => panic!("Expected Timeout, got {:?}", other),
    }
}

struct FallbackHost {
    calls: AtomicUsize,
}

impl CommandHost<TestData> for FallbackHost {
    fn fallback(&self, error: &Error) -> Option<TestData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match error.problem_reason() {
            Some(ProblemReason::ServerUnable) => Some(TestData {
                id: 0,
                name: "fallback".to_string(),
            }),
            _ => None,
        }
    }
}

#[tokio::test]
async fn test_command_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/501"))
        .respond_with(ResponseTemplate::new(501).set_body_string("not yet"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/500"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let executor = executor(&TrackingSleeper::new());
    let host = FallbackHost {
        calls: AtomicUsize::new(0),
    };

    let data = JsonQueryCommand::<TestData>::new("unable", "tests", get(&mock_server, "/501"))
        .execute(&executor, &host)
        .await
        .unwrap();
    assert_eq!(data.name, "fallback");

    let err = JsonQueryCommand::<TestData>::new("broken", "tests", get(&mock_server, "/500"))
        .execute(&executor, &host)
        .await
        .unwrap_err();
    assert_eq!(err.problem_reason(), Some(ProblemReason::ServerError));

    assert_eq!(host.calls.load(Ordering::SeqCst), 2);
}
