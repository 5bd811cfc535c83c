//! E2E tests for the HTTP time oracle.
//!
//! A mockito server stands in for the portal backend.

use chrono::{Local, TimeZone, Utc};
use evalguard_core::clock::ManualClock;
use evalguard_core::timer::{EvaluationTimer, MemoryTimerStore};
use evalguard_core::error::OracleError;
use evalguard_core::oracle::{HttpOracle, SessionStatus, StartOutcome, TimeCheck, TimeOracle};
use mockito::{Matcher, Server};
use serde_json::json;

fn oracle_for(server: &Server) -> HttpOracle {
    HttpOracle::new(&server.url()).unwrap()
}

/// Test: a timed start yields a session grant.
#[tokio::test]
async fn test_start_evaluation_timed() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/evaluation/start")
        .match_body(Matcher::Json(json!({ "evaluation_id": 42 })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "session_id": 17,
                "start_time": "2026-03-01T09:30:00",
                "time_limit": 30,
                "resumed": true
            })
            .to_string(),
        )
        .create_async()
        .await;

    let outcome = oracle_for(&server).start_evaluation(42).await.unwrap();

    let StartOutcome::Started(grant) = outcome else {
        panic!("expected a timed session, got {outcome:?}");
    };
    assert_eq!(grant.session_id, "17");
    assert_eq!(
        grant.start_time,
        Local
            .with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    );
    assert_eq!(grant.time_limit_minutes, 30.0);
    assert!(grant.resumed);
    mock.assert_async().await;
}

/// Test: a fresh attempt stamped with the portal's naive local time starts
/// with its full budget.
#[tokio::test]
async fn test_fresh_start_with_naive_local_time_keeps_full_budget() {
    let mut server = Server::new_async().await;
    let now = Utc::now();
    let naive_local = now
        .with_timezone(&Local)
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();
    server
        .mock("POST", "/api/evaluation/start")
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "session_id": "abc",
                "start_time": naive_local,
                "time_limit": 30
            })
            .to_string(),
        )
        .create_async()
        .await;

    let outcome = oracle_for(&server).start_evaluation(7).await.unwrap();
    let StartOutcome::Started(grant) = outcome else {
        panic!("expected a timed session, got {outcome:?}");
    };
    assert!((now - grant.start_time).num_seconds().abs() <= 1);

    let clock = ManualClock::new(now);
    let mut timer = EvaluationTimer::resume(
        &grant.session_id,
        grant.start_time,
        grant.time_limit_minutes,
        clock,
        MemoryTimerStore::new(),
    )
    .unwrap();
    assert!(timer.remaining_secs() >= 30 * 60 - 1);
    timer.tick();
    assert!(!timer.is_expired());
}

/// Test: timer_enabled=false means no countdown.
#[tokio::test]
async fn test_start_evaluation_untimed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/evaluation/start")
        .with_status(200)
        .with_body(r#"{"success": true, "timer_enabled": false, "message": "Take your time"}"#)
        .create_async()
        .await;

    let outcome = oracle_for(&server).start_evaluation(1).await.unwrap();
    assert_eq!(
        outcome,
        StartOutcome::Untimed {
            message: Some("Take your time".into())
        }
    );
}

/// Test: an expired previous attempt is distinguished from other failures.
#[tokio::test]
async fn test_start_evaluation_expired_and_failed() {
    let mut server = Server::new_async().await;
    let expired = server
        .mock("POST", "/api/evaluation/start")
        .match_body(Matcher::Json(json!({ "evaluation_id": 1 })))
        .with_status(200)
        .with_body(r#"{"success": false, "expired": true, "message": "Session expired"}"#)
        .create_async()
        .await;
    let failed = server
        .mock("POST", "/api/evaluation/start")
        .match_body(Matcher::Json(json!({ "evaluation_id": 2 })))
        .with_status(400)
        .with_body(r#"{"success": false, "error": "Evaluation is closed"}"#)
        .create_async()
        .await;

    let oracle = oracle_for(&server);
    assert_eq!(
        oracle.start_evaluation(1).await.unwrap(),
        StartOutcome::AlreadyExpired
    );
    assert_eq!(
        oracle.start_evaluation(2).await.unwrap(),
        StartOutcome::Failed {
            message: "Evaluation is closed".into()
        }
    );
    expired.assert_async().await;
    failed.assert_async().await;
}

/// Test: check-time floors fractional seconds.
#[tokio::test]
async fn test_check_time_ok() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/evaluation/check-time/abc")
        .with_status(200)
        .with_body(
            r#"{"success": true, "status": "ok", "remaining_seconds": 123.7, "elapsed_seconds": 1676.2}"#,
        )
        .create_async()
        .await;

    let check = oracle_for(&server).check_time("abc").await.unwrap();
    assert_eq!(check, TimeCheck::ok(123, 1676));
}

/// Test: check-time reports a server-side expiry.
#[tokio::test]
async fn test_check_time_expired() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/evaluation/check-time/abc")
        .with_status(200)
        .with_body(r#"{"success": true, "status": "expired", "remaining_seconds": 0}"#)
        .create_async()
        .await;

    let check = oracle_for(&server).check_time("abc").await.unwrap();
    assert_eq!(check, TimeCheck::expired());
}

/// Test: check-time failures surface as errors, never as verdicts.
#[tokio::test]
async fn test_check_time_failures() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/evaluation/check-time/broken")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;
    server
        .mock("GET", "/api/evaluation/check-time/unknown")
        .with_status(200)
        .with_body(r#"{"success": false, "message": "Session not found"}"#)
        .create_async()
        .await;

    let oracle = oracle_for(&server);
    assert!(matches!(
        oracle.check_time("broken").await,
        Err(OracleError::Status { status: 500, .. })
    ));
    assert!(matches!(
        oracle.check_time("unknown").await,
        Err(OracleError::Rejected { message, .. }) if message == "Session not found"
    ));
}

/// Test: mark-expired posts the session id.
#[tokio::test]
async fn test_mark_expired_posts_session_id() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/evaluation/mark-expired")
        .match_body(Matcher::Json(json!({ "session_id": "abc" })))
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .expect(1)
        .create_async()
        .await;

    oracle_for(&server).mark_expired("abc").await.unwrap();
    mock.assert_async().await;
}

/// Test: session-status maps every answer shape.
#[tokio::test]
async fn test_session_status_shapes() {
    let mut server = Server::new_async().await;
    let oracle = oracle_for(&server);

    let active = server
        .mock("GET", "/api/session-status")
        .with_status(200)
        .with_body(r#"{"success": true, "logged_in": true, "remaining_seconds": 290.5}"#)
        .create_async()
        .await;
    assert_eq!(
        oracle.session_status().await.unwrap(),
        SessionStatus::Active { remaining_secs: 290 }
    );
    active.remove_async().await;

    let logged_out = server
        .mock("GET", "/api/session-status")
        .with_status(200)
        .with_body(r#"{"success": true, "logged_in": false}"#)
        .create_async()
        .await;
    assert_eq!(
        oracle.session_status().await.unwrap(),
        SessionStatus::LoggedOut
    );
    logged_out.remove_async().await;

    server
        .mock("GET", "/api/session-status")
        .with_status(401)
        .create_async()
        .await;
    assert_eq!(
        oracle.session_status().await.unwrap(),
        SessionStatus::Rejected { status: 401 }
    );
}

/// Test: refresh-session reports success and rejection.
#[tokio::test]
async fn test_refresh_session() {
    let mut server = Server::new_async().await;
    let oracle = oracle_for(&server);

    let ok = server
        .mock("POST", "/api/refresh-session")
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .create_async()
        .await;
    oracle.refresh_session().await.unwrap();
    ok.remove_async().await;

    server
        .mock("POST", "/api/refresh-session")
        .with_status(200)
        .with_body(r#"{"success": false, "message": "Not logged in"}"#)
        .create_async()
        .await;
    assert!(matches!(
        oracle.refresh_session().await,
        Err(OracleError::Rejected { .. })
    ));
}

/// Test: a configured cookie is sent with every request.
#[tokio::test]
async fn test_configured_cookie_is_sent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/session-status")
        .match_header("cookie", "session=xyz")
        .with_status(200)
        .with_body(r#"{"success": true, "logged_in": true, "remaining_seconds": 3600}"#)
        .create_async()
        .await;

    let oracle = oracle_for(&server).with_cookie("session=xyz");
    assert_eq!(
        oracle.session_status().await.unwrap(),
        SessionStatus::Active { remaining_secs: 3600 }
    );
    mock.assert_async().await;
}

/// Test: a base URL with a path prefix keeps the prefix.
#[tokio::test]
async fn test_base_url_with_prefix() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/portal/api/session-status")
        .with_status(200)
        .with_body(r#"{"success": true, "logged_in": true, "remaining_seconds": 10}"#)
        .create_async()
        .await;

    let oracle = HttpOracle::new(&format!("{}/portal", server.url())).unwrap();
    oracle.session_status().await.unwrap();
    mock.assert_async().await;
}

/// Test: an unreachable server is a transport error.
#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let oracle = HttpOracle::new("http://127.0.0.1:9").unwrap();
    assert!(matches!(
        oracle.session_status().await,
        Err(OracleError::Transport { .. })
    ));
}
