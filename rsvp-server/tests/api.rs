use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use rsvp_server::api::router;
use rsvp_server::{AppState, CapturingNotifier, InMemoryRepository, ManualClock, RsvpService};

struct TestApp {
    app: Router,
    notifier: Arc<CapturingNotifier>,
}

fn test_app() -> TestApp {
    let notifier = Arc::new(CapturingNotifier::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap(),
    ));
    let service = RsvpService::new(
        Arc::new(InMemoryRepository::new()),
        notifier.clone(),
        clock,
        "http://rsvp.test",
    );
    TestApp {
        app: router(Arc::new(AppState::new(service))),
        notifier,
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec(), headers)
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes, _) = send(app, method, uri, token, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send_json(
        app,
        "POST",
        "/organizers",
        None,
        Some(json!({"name": "Host", "email": email})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["api_token"].as_str().unwrap().to_string()
}

async fn create_event(app: &Router, token: &str, title: &str) -> i64 {
    let (status, body) = send_json(
        app,
        "POST",
        "/events",
        Some(token),
        Some(json!({
            "title": title,
            "date": "2026-09-08T12:00",
            "location": "Town hall",
            "custom_fields": {"meal_options": ["Fish", "Veg"]}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

async fn invite(app: &Router, token: &str, event_id: i64, name: &str) -> Value {
    let (status, body) = send_json(
        app,
        "POST",
        &format!("/events/{}/guests", event_id),
        Some(token),
        Some(json!({"name": name, "email": format!("{}@example.com", name)})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn test_health_and_help() {
    let t = test_app();
    let (status, body) = send_json(&t.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send_json(&t.app, "GET", "/help", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"].as_array().unwrap().len() > 10);
}

#[tokio::test]
async fn test_organizer_routes_require_bearer_token() {
    let t = test_app();
    let (status, body) = send_json(&t.app, "GET", "/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Authorization"));

    let (status, _) = send_json(&t.app, "GET", "/events", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let t = test_app();
    register(&t.app, "host@example.com").await;
    let (status, _) = send_json(
        &t.app,
        "POST",
        "/organizers",
        None,
        Some(json!({"name": "Again", "email": "host@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_bad_event_date_is_bad_request() {
    let t = test_app();
    let token = register(&t.app, "host@example.com").await;
    let (status, body) = send_json(
        &t.app,
        "POST",
        "/events",
        Some(&token),
        Some(json!({"title": "Party", "date": "next tuesday"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("next tuesday"));
}

#[tokio::test]
async fn test_other_organizers_event_is_forbidden() {
    let t = test_app();
    let owner = register(&t.app, "owner@example.com").await;
    let intruder = register(&t.app, "intruder@example.com").await;
    let event_id = create_event(&t.app, &owner, "Private").await;

    let uri = format!("/events/{}", event_id);
    let (status, _) = send_json(&t.app, "GET", &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send_json(&t.app, "DELETE", &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(&t.app, "GET", "/events/9999", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guest_rsvp_flow() {
    let t = test_app();
    let token = register(&t.app, "host@example.com").await;
    let event_id = create_event(&t.app, &token, "Harvest Dinner").await;
    let invitation = invite(&t.app, &token, event_id, "ada").await;

    assert_eq!(invitation["email_sent"], true);
    let link = invitation["rsvp_link"].as_str().unwrap();
    let rsvp_token = invitation["guest"]["access_token"].as_str().unwrap();
    assert_eq!(link, format!("http://rsvp.test/rsvp/{}", rsvp_token));
    assert_eq!(
        t.notifier.sent_to("ada@example.com")[0].subject,
        "You're Invited: Harvest Dinner"
    );

    let rsvp_uri = format!("/rsvp/{}", rsvp_token);
    let (status, view) = send_json(&t.app, "GET", &rsvp_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["event"]["title"], "Harvest Dinner");
    assert_eq!(view["guest"]["status"], "pending");

    let (status, guest) = send_json(
        &t.app,
        "POST",
        &rsvp_uri,
        None,
        Some(json!({"status": "confirmed", "plus_one_count": 2, "responses": {"meal": "veg"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(guest["status"], "confirmed");
    assert_eq!(guest["plus_one_count"], 2);
    assert_eq!(guest["responses"]["meal"], "veg");

    let (status, detail) = send_json(
        &t.app,
        "GET",
        &format!("/events/{}", event_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["stats"]["confirmed"], 1);
    assert_eq!(detail["stats"]["total_attending"], 3);
    assert_eq!(detail["guests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_rsvp_status_is_rejected_without_change() {
    let t = test_app();
    let token = register(&t.app, "host@example.com").await;
    let event_id = create_event(&t.app, &token, "Dinner").await;
    let invitation = invite(&t.app, &token, event_id, "ada").await;
    let rsvp_uri = format!(
        "/rsvp/{}",
        invitation["guest"]["access_token"].as_str().unwrap()
    );

    let (status, _) = send_json(
        &t.app,
        "POST",
        &rsvp_uri,
        None,
        Some(json!({"status": "maybe"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, view) = send_json(&t.app, "GET", &rsvp_uri, None, None).await;
    assert_eq!(view["guest"]["status"], "pending");

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/rsvp/not-a-token",
        None,
        Some(json!({"status": "confirmed"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_rsvp_link_wins_over_bad_body() {
    let t = test_app();
    let token = register(&t.app, "host@example.com").await;
    let event_id = create_event(&t.app, &token, "Dinner").await;
    let invitation = invite(&t.app, &token, event_id, "ada").await;
    let rsvp_uri = format!(
        "/rsvp/{}",
        invitation["guest"]["access_token"].as_str().unwrap()
    );

    for body in [json!({"plus_one_count": 1}), json!({"status": "maybe"})] {
        let (status, _) =
            send_json(&t.app, "POST", "/rsvp/not-a-token", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);

        let (status, _) = send_json(&t.app, "POST", &rsvp_uri, None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    }

    let (status, _, _) = send(&t.app, "POST", "/rsvp/not-a-token", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remind_and_export() {
    let t = test_app();
    let token = register(&t.app, "host@example.com").await;
    let event_id = create_event(&t.app, &token, "Board Games Night").await;
    invite(&t.app, &token, event_id, "ada").await;
    let bob = invite(&t.app, &token, event_id, "bob").await;
    send_json(
        &t.app,
        "POST",
        &format!("/rsvp/{}", bob["guest"]["access_token"].as_str().unwrap()),
        None,
        Some(json!({"status": "declined"})),
    )
    .await;

    let (status, report) = send_json(
        &t.app,
        "POST",
        &format!("/events/{}/guests/remind", event_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["sent"], 1);
    assert_eq!(t.notifier.sent_to("ada@example.com").len(), 2);
    assert_eq!(t.notifier.sent_to("bob@example.com").len(), 1);

    let (status, bytes, headers) = send(
        &t.app,
        "GET",
        &format!("/events/{}/guests/export", event_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=guests_Board_Games_Night.csv"
    );
    let csv = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "Name,Email,Phone,Status,Plus Ones,Last Updated,Responses"
    );
    assert!(lines[2].starts_with("bob,bob@example.com,,declined,0,"));
}

#[tokio::test]
async fn test_guest_update_and_delete() {
    let t = test_app();
    let token = register(&t.app, "host@example.com").await;
    let event_id = create_event(&t.app, &token, "Dinner").await;
    let other_event = create_event(&t.app, &token, "Lunch").await;
    let invitation = invite(&t.app, &token, event_id, "ada").await;
    let guest_id = invitation["guest"]["id"].as_i64().unwrap();

    let (status, guest) = send_json(
        &t.app,
        "PUT",
        &format!("/events/{}/guests/{}", event_id, guest_id),
        Some(&token),
        Some(json!({"name": "Ada L.", "email": "ada@example.org", "phone": "555-0199"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(guest["name"], "Ada L.");
    assert_eq!(guest["phone"], "555-0199");

    let (status, _) = send_json(
        &t.app,
        "DELETE",
        &format!("/events/{}/guests/{}", other_event, guest_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &t.app,
        "DELETE",
        &format!("/events/{}/guests/{}", event_id, guest_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, guests) = send_json(
        &t.app,
        "GET",
        &format!("/events/{}/guests", event_id),
        Some(&token),
        None,
    )
    .await;
    assert!(guests.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_analytics_routes() {
    let t = test_app();
    let token = register(&t.app, "host@example.com").await;
    let event_id = create_event(&t.app, &token, "Dinner").await;
    let ada = invite(&t.app, &token, event_id, "ada").await;
    invite(&t.app, &token, event_id, "bob").await;
    send_json(
        &t.app,
        "POST",
        &format!("/rsvp/{}", ada["guest"]["access_token"].as_str().unwrap()),
        None,
        Some(json!({"status": "confirmed"})),
    )
    .await;

    let (status, analytics) = send_json(
        &t.app,
        "GET",
        &format!("/events/{}/analytics", event_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analytics["stats"]["total_guests"], 2);
    assert_eq!(analytics["stats"]["response_rate"], 0.5);
    assert_eq!(analytics["timeline"]["2026-09-01"], 2);

    let (status, overall) = send_json(&t.app, "GET", "/analytics", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overall["total_events"], 1);
    assert_eq!(overall["average_confirmation_rate"], 0.5);
}
