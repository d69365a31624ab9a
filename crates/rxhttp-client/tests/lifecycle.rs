//! Request lifecycle tests against a scripted transport.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use rxhttp_client::{HttpRequest, Observable, RxHttpError};
use rxhttp_core::{DeliveryMode, RequestOptions};
use rxhttp_testing::{
    StubResponse, StubTransport, assert_connection_refused, assert_server_error, fixtures,
};
use serde::Deserialize;
use serde_json::{Value, json};

const URL: &str = "http://localhost/fake";

fn controller<T>(stub: &StubTransport, mode: DeliveryMode) -> HttpRequest<T, StubTransport>
where
    T: serde::de::DeserializeOwned + Send + 'static,
{
    HttpRequest::new(Arc::new(stub.clone()), URL, RequestOptions::new(), mode)
}

/// Read until completion or error. Fails the test if that takes too long.
async fn drain<T>(observable: &Observable<T>) -> (Vec<T>, Option<RxHttpError>) {
    tokio::time::timeout(Duration::from_secs(5), async {
        let mut values = Vec::new();
        while let Some(item) = observable.next().await {
            match item {
                Ok(value) => values.push(value),
                Err(error) => return (values, Some(error)),
            }
        }
        (values, None)
    })
    .await
    .expect("observable did not terminate")
}

/// Let spawned calls run until the stub has seen `count` requests.
async fn wait_for_requests(stub: &StubTransport, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while stub.request_count() < count {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("transport was not called");
}

#[tokio::test]
async fn test_simple_emits_once_then_completes() {
    let stub = StubTransport::with_responses([StubResponse::json(fixtures::sample_user())]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Simple);

    let values = Arc::new(Mutex::new(Vec::new()));
    let errored = Arc::new(AtomicBool::new(false));
    let completions = Arc::new(AtomicUsize::new(0));

    let subscription = request.dispatch().subscribe(
        {
            let values = Arc::clone(&values);
            move |value| values.lock().unwrap().push(value)
        },
        {
            let errored = Arc::clone(&errored);
            move |_| errored.store(true, Ordering::SeqCst)
        },
        {
            let completions = Arc::clone(&completions);
            move || {
                completions.fetch_add(1, Ordering::SeqCst);
            }
        },
    );

    tokio::time::timeout(Duration::from_secs(5), subscription.closed())
        .await
        .unwrap();

    assert_eq!(*values.lock().unwrap(), vec![json!({"id": 11, "name": "mike"})]);
    assert!(!errored.load(Ordering::SeqCst));
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_simple_accepts_buffered_body() {
    let stub = StubTransport::with_responses([StubResponse::chunks(vec!["[1,", "2]"]).buffered()]);
    let mut request = controller::<Vec<u8>>(&stub, DeliveryMode::Simple);

    let (values, error) = drain(&request.dispatch()).await;
    assert_eq!(values, vec![vec![1, 2]]);
    assert!(error.is_none());
}

#[tokio::test]
async fn test_simple_with_non_json_body_completes_without_value() {
    let stub = StubTransport::with_responses([StubResponse::text(200, "OK")]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Simple);

    let (values, error) = drain(&request.dispatch()).await;
    assert!(values.is_empty());
    assert!(error.is_none());
}

#[tokio::test]
async fn test_stream_emits_one_value_per_frame() {
    let stub =
        StubTransport::with_responses([StubResponse::chunks(vec![r#"{"a":1}"#, r#"{"b":2}"#])]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let (values, error) = drain(&request.dispatch()).await;
    assert_eq!(values, vec![json!({"a": 1}), json!({"b": 2})]);
    assert!(error.is_none());
}

#[tokio::test]
async fn test_stream_joins_frame_split_across_chunks() {
    let stub = StubTransport::with_responses([StubResponse::chunks(vec![r#"{"a""#, ":1}"])]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let (values, _) = drain(&request.dispatch()).await;
    assert_eq!(values, vec![json!({"a": 1})]);
}

#[tokio::test]
async fn test_stream_survives_invalid_utf8_between_frames() {
    let stub = StubTransport::with_responses([StubResponse::chunks(vec![
        bytes::Bytes::from_static(br#"{"a":1}"#),
        bytes::Bytes::from_static(&[0xff, 0xfe, 0xfd]),
        bytes::Bytes::from_static(br#"{"b":2}"#),
    ])]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let (values, error) = drain(&request.dispatch()).await;
    assert_eq!(values, vec![json!({"a": 1}), json!({"b": 2})]);
    assert!(error.is_none());
}

#[tokio::test]
async fn test_stream_keeps_multibyte_character_split_across_chunks() {
    let body = serde_json::to_vec(&json!({"text": fixtures::MULTIBYTE_TEXT})).unwrap();
    let stub = StubTransport::with_responses([StubResponse::chunks(fixtures::split_every(
        &body, 1,
    ))]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let (values, _) = drain(&request.dispatch()).await;
    assert_eq!(values, vec![json!({"text": fixtures::MULTIBYTE_TEXT})]);
}

#[derive(Debug, Deserialize, PartialEq)]
struct Change {
    seq: u64,
    id: String,
}

#[tokio::test]
async fn test_stream_decodes_feed_cut_at_arbitrary_boundaries() {
    let feed = fixtures::changes(25);
    let body = fixtures::ndjson(&feed);
    let stub = StubTransport::with_responses([StubResponse::chunks(fixtures::split_every(
        &body, 7,
    ))]);
    let mut request = controller::<Change>(&stub, DeliveryMode::Stream);

    let (values, error) = drain(&request.dispatch()).await;
    assert!(error.is_none());
    assert_eq!(values.len(), 25);
    assert_eq!(
        values.last(),
        Some(&Change {
            seq: 25,
            id: "doc-25".to_string()
        })
    );
}

#[tokio::test]
async fn test_stream_skips_malformed_and_mistyped_frames() {
    let stub = StubTransport::with_responses([StubResponse::chunks(vec![
        "{\"seq\":1,\"id\":\"a\"}\n",
        "{\"seq\":,}\n",
        "{\"seq\":\"two\",\"id\":\"b\"}\n",
        "{\"seq\":3,\"id\":\"c\"}\n",
    ])]);
    let mut request = controller::<Change>(&stub, DeliveryMode::Stream);

    let (values, error) = drain(&request.dispatch()).await;
    assert!(error.is_none());
    assert_eq!(
        values.iter().map(|c| c.seq).collect::<Vec<_>>(),
        vec![1, 3]
    );
}

#[tokio::test]
async fn test_stream_drops_values_nested_in_malformed_frame() {
    let stub = StubTransport::with_responses([StubResponse::chunks(vec![
        r#"{"meta":{"seq":7},"#,
        r#","tags":["x"]}{"seq":1}"#,
        "\n",
    ])]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let (values, error) = drain(&request.dispatch()).await;
    assert!(error.is_none());
    assert_eq!(values, vec![json!({"seq": 1})]);
}

#[tokio::test]
async fn test_cancel_during_stream_completes_observer() {
    let stub = StubTransport::with_responses([
        StubResponse::chunks(vec![r#"{"seq":1}"#]).keep_open()
    ]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let observable = request.dispatch();
    assert_eq!(observable.next().await.unwrap().unwrap(), json!({"seq": 1}));

    request.cancel();

    let (values, error) = drain(&observable).await;
    assert!(values.is_empty());
    assert!(error.is_none());
    assert!(observable.is_closed());
    assert!(!request.is_in_flight());
}

#[tokio::test]
async fn test_cancel_stops_later_frames() {
    let stub = StubTransport::with_responses([StubResponse::chunks(vec![
        "{\"seq\":1}",
        "{\"seq\":2}",
    ])
    .with_chunk_delay(Duration::from_millis(50))
    .keep_open()]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let observable = request.dispatch();
    assert_eq!(observable.next().await.unwrap().unwrap(), json!({"seq": 1}));
    request.cancel();

    let (values, _) = drain(&observable).await;
    assert!(values.is_empty());
}

#[tokio::test]
async fn test_latest_dispatch_wins() {
    let stub = StubTransport::with_responses([
        StubResponse::json(json!({"call": 1})).with_delay(Duration::from_millis(100)),
        StubResponse::json(json!({"call": 2})),
    ]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Simple);

    let first = request.dispatch();
    wait_for_requests(&stub, 1).await;
    let second = request.dispatch();
    assert!(first.same_as(&second));

    let (values, error) = drain(&second).await;
    assert_eq!(values, vec![json!({"call": 2})]);
    assert!(error.is_none());
    assert_eq!(stub.request_count(), 2);
}

#[tokio::test]
async fn test_latest_stream_dispatch_wins() {
    let stub = StubTransport::with_responses([
        StubResponse::chunks(vec![r#"{"from":"first"}"#])
            .with_delay(Duration::from_millis(50))
            .keep_open(),
        StubResponse::chunks(vec![r#"{"from":"second"}"#]),
    ]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    request.dispatch();
    wait_for_requests(&stub, 1).await;
    let (values, _) = drain(&request.dispatch()).await;
    assert_eq!(values, vec![json!({"from": "second"})]);
}

#[tokio::test]
async fn test_non_2xx_surfaces_server_error_in_every_mode() {
    for mode in [
        DeliveryMode::Simple,
        DeliveryMode::SimpleWithHeaders,
        DeliveryMode::Stream,
    ] {
        let stub = StubTransport::with_responses([StubResponse::status(
            404,
            json!({"error": "not_found", "reason": "missing"}),
        )]);
        let mut request = controller::<Value>(&stub, mode);

        let (values, error) = drain(&request.dispatch()).await;
        assert!(values.is_empty(), "{mode}");
        let error = error.expect("server error expected");
        assert_server_error(&error, 404);
        assert_eq!(
            error.server_response().unwrap().error_message,
            Some(json!({"error": "not_found", "reason": "missing"}))
        );
        assert!(!error.is_retryable());
    }
}

#[tokio::test]
async fn test_refused_before_any_byte_is_an_error() {
    let stub = StubTransport::with_responses([StubResponse::refused("connect ECONNREFUSED")]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let (values, error) = drain(&request.dispatch()).await;
    assert!(values.is_empty());
    let error = error.expect("connection refused expected");
    assert_connection_refused(&error);
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_body_failure_before_any_byte_is_an_error() {
    let stub = StubTransport::with_responses([
        StubResponse::chunks(Vec::<&str>::new()).fail_after("reset")
    ]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let (_, error) = drain(&request.dispatch()).await;
    assert_connection_refused(&error.expect("connection refused expected"));
}

#[tokio::test]
async fn test_drop_after_bytes_completes() {
    for mode in [DeliveryMode::Simple, DeliveryMode::Stream] {
        let stub = StubTransport::with_responses([
            StubResponse::chunks(vec!["{\"seq\":1}\n{\"se"]).fail_after("reset")
        ]);
        let mut request = controller::<Value>(&stub, mode);

        let (values, error) = drain(&request.dispatch()).await;
        assert!(error.is_none(), "{mode}: {error:?}");
        if mode.is_stream() {
            assert_eq!(values, vec![json!({"seq": 1})]);
        } else {
            assert!(values.is_empty());
        }
    }
}

#[tokio::test]
async fn test_disconnect_is_silent_and_keeps_observable() {
    let stub = StubTransport::with_responses([
        StubResponse::chunks(vec![r#"{"seq":1}"#]).keep_open(),
        StubResponse::chunks(vec![r#"{"seq":2}"#]),
    ]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let observable = request.dispatch();
    assert_eq!(observable.next().await.unwrap().unwrap(), json!({"seq": 1}));

    request.disconnect();
    let nothing = tokio::time::timeout(Duration::from_millis(50), observable.next()).await;
    assert!(nothing.is_err(), "disconnect must not notify the observer");
    assert!(!observable.is_closed());

    let again = request.dispatch();
    assert!(again.same_as(&observable));
    let (values, error) = drain(&again).await;
    assert_eq!(values, vec![json!({"seq": 2})]);
    assert!(error.is_none());
}

#[tokio::test]
async fn test_dispatch_after_completion_uses_fresh_observable() {
    let stub = StubTransport::with_responses([
        StubResponse::json(json!(1)),
        StubResponse::json(json!(2)),
    ]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Simple);

    let first = request.dispatch();
    assert_eq!(drain(&first).await.0, vec![json!(1)]);

    let second = request.dispatch();
    assert!(!second.same_as(&first));
    assert_eq!(drain(&second).await.0, vec![json!(2)]);
}

#[tokio::test]
async fn test_dropping_controller_ends_observable() {
    let stub = StubTransport::with_responses([
        StubResponse::chunks(vec![r#"{"seq":1}"#]).keep_open()
    ]);
    let mut request = controller::<Value>(&stub, DeliveryMode::Stream);

    let observable = request.dispatch();
    assert!(observable.next().await.is_some());

    drop(request);
    let (values, error) = drain(&observable).await;
    assert!(values.is_empty());
    assert!(error.is_none());
}

#[tokio::test]
async fn test_headers_merge_case_insensitively() {
    let stub = StubTransport::with_responses([StubResponse::json(json!({}))]);
    let mut request = HttpRequest::<Value, _>::new(
        Arc::new(stub.clone()),
        URL,
        RequestOptions::new()
            .with_header("CONTENT-TYPE", "application/merge-patch+json")
            .with_header("If-Match", "1-abc"),
        DeliveryMode::Simple,
    );

    drain(&request.dispatch()).await;

    let sent = &stub.requests()[0];
    assert_eq!(sent.headers.len(), 2);
    assert_eq!(
        sent.headers.get("content-type"),
        Some("application/merge-patch+json")
    );
    assert_eq!(sent.headers.get("if-match"), Some("1-abc"));
}
