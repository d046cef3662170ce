mod support;
use support::transport::Mock;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqkit::{CancellationToken, Client, Options};

#[tokio::test]
async fn deadline_settles_with_a_timeout_error() {
    let _ = env_logger::try_init();

    let mock = Arc::new(Mock::new().never_settles());
    let api = Client::new(mock.clone());

    let start = tokio::time::Instant::now();
    let err = api
        .get(
            "https://api.test/slow",
            Options::new().timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout());
    assert!(!err.is_aborted());
    assert!(err.to_string().contains("Request timed out"));
    assert_eq!(err.url().map(|u| u.as_str()), Some("https://api.test/slow"));
    // the deadline fired near the configured timeout, not at some later cleanup
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);

    // hitting the deadline also cancelled the in-flight request
    assert!(mock.requests()[0].token().unwrap().is_cancelled());
}

#[tokio::test]
async fn settles_before_the_deadline() {
    let _ = env_logger::try_init();

    let mock = Arc::new(Mock::new().delay(Duration::from_millis(10)).body("ok"));
    let api = Client::new(mock.clone());

    let pending = api.get(
        "https://api.test/fast",
        Options::new().timeout(Duration::from_millis(200)),
    );
    let text = pending.text().await.unwrap();
    assert_eq!(text, "ok");

    // a look at the same dispatch after the deadline has passed still sees
    // the one successful settlement
    tokio::time::sleep(Duration::from_millis(250)).await;
    let again = pending.text().await.unwrap();
    assert_eq!(again, "ok");
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn zero_timeout_disables_the_deadline() {
    let _ = env_logger::try_init();

    let mock = Arc::new(Mock::new().delay(Duration::from_millis(30)));
    let api = Client::with_options(mock, Options::new().timeout(Duration::ZERO));

    let res = api.get("https://api.test/x", Options::new()).await;
    assert!(res.is_ok());
}

#[tokio::test]
async fn first_settlement_wins_over_the_abort_error() {
    let _ = env_logger::try_init();

    let mock = Arc::new(Mock::new().delay(Duration::from_secs(2)));
    let api = Client::new(mock.clone());

    let err = api
        .get(
            "https://api.test/slow",
            Options::new().timeout(Duration::from_millis(40)),
        )
        .await
        .unwrap_err();

    // the deadline settles the dispatch; the abort error the cancelled
    // transport would produce is discarded with it
    assert!(err.is_timeout());
    assert!(!err.is_aborted());
}

#[tokio::test]
async fn caller_cancellation_aborts_the_request() {
    let _ = env_logger::try_init();

    let token = CancellationToken::new();
    let mock = Arc::new(Mock::new().never_settles());
    let api = Client::new(mock.clone());

    let pending = api.get(
        "https://api.test/hang",
        Options::new()
            .timeout(Duration::from_secs(5))
            .cancellation_token(token.clone()),
    );

    let caller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        caller.cancel();
    });

    let err = pending.await.unwrap_err();
    assert!(err.is_aborted());
    assert!(!err.is_timeout());

    // the abort fanned out to the transport's token
    assert!(mock.requests()[0].token().unwrap().is_cancelled());
}

#[tokio::test]
async fn caller_token_passes_through_without_a_timeout() {
    let _ = env_logger::try_init();

    let token = CancellationToken::new();
    let mock = Arc::new(Mock::new().never_settles());
    let api = Client::new(mock.clone());

    let pending = api.get(
        "https://api.test/hang",
        Options::new().cancellation_token(token.clone()),
    );
    // dispatch happens at call time, before anything is awaited
    assert_eq!(mock.requests().len(), 1);

    token.cancel();
    let err = pending.await.unwrap_err();

    assert!(err.is_aborted());
    // without a deadline the transport saw the caller's own token
    assert!(mock.requests()[0].token().unwrap().is_cancelled());
}

#[tokio::test]
async fn abort_during_a_transport_delay() {
    let _ = env_logger::try_init();

    let token = CancellationToken::new();
    let mock = Arc::new(Mock::new().delay(Duration::from_secs(5)).body("late"));
    let api = Client::new(mock.clone());

    let pending = api.get(
        "https://api.test/slow",
        Options::new().cancellation_token(token.clone()),
    );

    let caller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        caller.cancel();
    });

    let err = pending.await.unwrap_err();
    assert!(err.is_aborted());
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn timeout_leaves_the_caller_token_alone() {
    let _ = env_logger::try_init();

    let caller = CancellationToken::new();
    let mock = Arc::new(Mock::new().never_settles());
    let api = Client::new(mock.clone());

    let err = api
        .get(
            "https://api.test/hang",
            Options::new()
                .timeout(Duration::from_millis(40))
                .cancellation_token(caller.clone()),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    // the deadline cancels only the internal token it substituted
    assert!(!caller.is_cancelled());
    assert!(mock.requests()[0].token().unwrap().is_cancelled());
}

#[tokio::test]
async fn deadline_without_transport_cooperation() {
    let _ = env_logger::try_init();

    let caller = CancellationToken::new();
    let mock = Arc::new(Mock::new().never_settles().without_cancellation());
    let api = Client::new(mock.clone());

    let err = api
        .get(
            "https://api.test/hang",
            Options::new()
                .timeout(Duration::from_millis(50))
                .cancellation_token(caller.clone()),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    // no internal token was substituted and nobody cancelled the caller's
    assert!(!caller.is_cancelled());
    assert!(!mock.requests()[0].token().unwrap().is_cancelled());
}

#[tokio::test]
async fn failure_hook_sees_the_timeout() {
    let _ = env_logger::try_init();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();

    let mock = Arc::new(Mock::new().never_settles());
    let api = Client::with_options(
        mock,
        Options::new().on_failure(move |err| {
            counter.fetch_add(1, Ordering::SeqCst);
            err
        }),
    );

    let err = api
        .get(
            "https://api.test/slow",
            Options::new().timeout(Duration::from_millis(40)),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
