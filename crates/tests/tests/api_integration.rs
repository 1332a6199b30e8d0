use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use raksha_agents::UNAVAILABLE_REPLY;
use raksha_api::{build_app_with, ApiConfig};
use raksha_remote::{GeminiConfig, MapsConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "dev-raksha-key";
const PATH: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
const CONTACTS: [&str; 3] = ["+911234567890", "+91 98765-43210", "9845012345"];
const SECRET: &str = "SECRET-KEY-123";

fn app() -> Router {
    build_app_with(ApiConfig::default()).expect("app should build")
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, parsed)
}

fn route(distance: i64, points: &str) -> Value {
    json!({
        "summary": format!("route {distance}"),
        "legs": [{
            "distance": { "text": format!("{distance} m"), "value": distance },
            "duration": { "text": "10 mins", "value": 600 }
        }],
        "overview_polyline": { "points": points }
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["capabilities"]["generator"], "offline");
    assert_eq!(parsed["capabilities"]["directions"], false);
}

#[tokio::test]
async fn chat_requires_api_key() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": "hello" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn app_questions_are_answered_locally() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "text": "How does the SOS button work?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "local");
    assert_eq!(body["category"], "sos_feature");
    assert_eq!(body["local_match"], "app_phrase");
    assert_eq!(body["turn_count"], 3);
    assert!(body["reply_text"].as_str().unwrap().contains("SOS"));
}

#[tokio::test]
async fn general_questions_fail_softly_without_a_generator() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "text": "What is the capital of France?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "failure");
    assert_eq!(body["reply_text"], UNAVAILABLE_REPLY);
    assert!(body["category"].is_null());
}

#[tokio::test]
async fn history_is_append_only_per_session() {
    let app = app();
    let (_, first) = send(&app, "POST", "/v1/chat", Some(json!({ "text": "hello" }))).await;
    let session_id = first["session_id"].as_str().unwrap().to_string();

    let (_, second) = send(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "session_id": session_id, "text": "thanks!" })),
    )
    .await;
    assert_eq!(second["turn_count"], 5);
    assert_eq!(second["category"], "thanks");

    let (status, history) = send(&app, "GET", &format!("/v1/chat/{session_id}/history"), None).await;
    assert_eq!(status, StatusCode::OK);
    let turns = history["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 5);
    assert_eq!(turns[0]["is_from_user"], false);
    assert_eq!(turns[1]["text"], "hello");
    assert_eq!(turns[3]["text"], "thanks!");

    let (status, _) = send(&app, "GET", "/v1/chat/unknown-session/history", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_chat_text_is_rejected() {
    let (status, body) = send(&app(), "POST", "/v1/chat", Some(json!({ "text": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_message");
}

#[tokio::test]
async fn welcome_message_names_the_app() {
    let mut config = ApiConfig::default();
    config.app_name = "SafeWalk".to_string();
    let app = build_app_with(config).unwrap();

    let (status, body) = send(&app, "GET", "/v1/chat/welcome", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["text"].as_str().unwrap().contains("SafeWalk"));
}

#[tokio::test]
async fn route_select_marks_shortest() {
    let (status, body) = send(
        &app(),
        "POST",
        "/v1/routes/select",
        Some(json!({
            "status": "OK",
            "routes": [route(5000, PATH), route(3000, PATH), route(4000, PATH)]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preferred_index"], 1);
    let candidates = body["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[1]["is_preferred"], true);
    assert_eq!(candidates[0]["is_preferred"], false);
    assert_eq!(body["bounds"]["south_west"]["latitude"], 38.5);
}

#[tokio::test]
async fn route_select_without_routes_is_not_found() {
    let app = app();
    let (status, body) = send(&app, "POST", "/v1/routes/select", Some(json!({ "routes": [] }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_route_found");

    let (status, _) = send(
        &app,
        "POST",
        "/v1/routes/select",
        Some(json!({ "status": "ZERO_RESULTS", "routes": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn route_select_with_only_broken_routes_is_unprocessable() {
    let (status, body) = send(
        &app(),
        "POST",
        "/v1/routes/select",
        Some(json!({ "routes": [route(1000, "_p~i"), route(2000, "_p~iF")] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "no_usable_route");
    assert_eq!(body["rejected"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn polyline_decode_reports_errors() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/polyline/decode",
        Some(json!({ "encoded": PATH })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (status, body) = send(
        &app,
        "POST",
        "/v1/polyline/decode",
        Some(json!({ "encoded": "_p~iF" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_polyline");
    assert_eq!(body["detail"]["kind"], "truncated");
}

#[tokio::test]
async fn plan_without_maps_key_is_unavailable() {
    let (status, body) = send(
        &app(),
        "POST",
        "/v1/routes/plan",
        Some(json!({
            "origin": { "latitude": 28.61, "longitude": 77.2 },
            "destination": { "latitude": 28.7, "longitude": 77.1 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "directions_unavailable");
}

#[tokio::test]
async fn sos_alert_needs_contacts() {
    let app = app();
    let location = json!({ "latitude": 28.6139, "longitude": 77.209 });

    let (status, body) = send(
        &app,
        "POST",
        "/v1/sos/alert",
        Some(json!({ "location": location, "contacts": ["", "  "] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "no_contacts");

    let (status, body) = send(
        &app,
        "POST",
        "/v1/sos/alert",
        Some(json!({ "location": location, "contacts": ["+911234567890", "+919876543210", "12345"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "too_few_contacts");
    assert_eq!(body["detail"]["valid"], 2);
    assert_eq!(body["detail"]["rejected"], json!(["12345"]));

    let (status, body) = send(
        &app,
        "POST",
        "/v1/sos/alert",
        Some(json!({ "sender": "Asha", "location": location, "contacts": CONTACTS })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipients"], json!(CONTACTS));
    let message = body["alert"]["message"].as_str().unwrap();
    assert!(message.starts_with("🚨 EMERGENCY ALERT 🚨"));
    assert!(message.contains("Asha is in danger"));
    assert!(message.contains("https://maps.google.com/?q=28.6139,77.209"));
}

#[tokio::test]
async fn sos_session_alerts_only_while_active() {
    let app = app();
    let update = json!({
        "location": { "latitude": 12.97, "longitude": 77.59 },
        "contacts": CONTACTS
    });

    let (status, _) = send(&app, "POST", "/v1/sos/s1/location", Some(update.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/v1/sos/s1/start", Some(json!({ "sender": "Asha" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "no_contacts");

    let (status, body) = send(
        &app,
        "POST",
        "/v1/sos/s1/start",
        Some(json!({ "sender": "Asha", "contacts": CONTACTS })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["state"], "active");

    let (status, body) = send(
        &app,
        "POST",
        "/v1/sos/s1/location",
        Some(json!({
            "location": { "latitude": 12.97, "longitude": 77.59 },
            "contacts": ["+911234567890"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "too_few_contacts");

    let (_, body) = send(&app, "POST", "/v1/sos/s1/location", Some(update.clone())).await;
    assert!(body["alert"]["message"].as_str().unwrap().contains("Asha"));
    assert_eq!(body["recipients"], json!(CONTACTS));

    let (_, body) = send(&app, "POST", "/v1/sos/s1/location", Some(update.clone())).await;
    assert!(body["alert"].is_null());

    let (_, body) = send(&app, "POST", "/v1/sos/s1/stop", None).await;
    assert_eq!(body["state"]["state"], "idle");

    let (_, body) = send(&app, "POST", "/v1/sos/s1/location", Some(update)).await;
    assert!(body["alert"].is_null());
    assert_eq!(body["state"]["state"], "idle");
}

#[tokio::test]
async fn navigation_progress_reports_arrival() {
    let (status, body) = send(
        &app(),
        "POST",
        "/v1/navigation/progress",
        Some(json!({
            "current": { "latitude": 28.6139, "longitude": 77.209 },
            "destination": { "latitude": 28.6141, "longitude": 77.209 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["arrived"], true);
    assert_eq!(body["instruction"], "You have arrived!");
}

#[tokio::test]
async fn out_of_range_coordinates_are_rejected() {
    let (status, body) = send(
        &app(),
        "POST",
        "/v1/navigation/progress",
        Some(json!({
            "current": { "latitude": 95.0, "longitude": 77.209 },
            "destination": { "latitude": 28.6141, "longitude": 77.209 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_coordinate");
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let mut config = ApiConfig::default();
    config.rate_limit_max = 2;
    config.rate_limit_window = Duration::from_secs(60);
    let app = build_app_with(config).unwrap();

    for _ in 0..2 {
        let (status, _) = send(&app, "GET", "/v1/chat/welcome", None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, "GET", "/v1/chat/welcome", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");

    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn chat_sessions_are_capped() {
    let mut config = ApiConfig::default();
    config.max_sessions = 1;
    let app = build_app_with(config).unwrap();

    let (_, first) = send(&app, "POST", "/v1/chat", Some(json!({ "text": "hello" }))).await;
    let (_, second) = send(&app, "POST", "/v1/chat", Some(json!({ "text": "thanks!" }))).await;
    let first_id = first["session_id"].as_str().unwrap();
    let second_id = second["session_id"].as_str().unwrap();
    assert_ne!(first_id, second_id);

    let (status, _) = send(&app, "GET", &format!("/v1/chat/{first_id}/history"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &format!("/v1/chat/{second_id}/history"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["sessions"]["chat"], 1);
}

#[tokio::test]
async fn place_search_validates_and_needs_maps_key() {
    let app = app();
    let (status, body) = send(&app, "POST", "/v1/places/search", Some(json!({ "query": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_query");

    let (status, body) = send(
        &app,
        "POST",
        "/v1/places/search",
        Some(json!({ "query": "India Gate" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "places_unavailable");
}

#[tokio::test]
async fn health_names_the_configured_generator() {
    let mut config = ApiConfig::default();
    config.gemini = Some(GeminiConfig::new("gemini-key"));
    let app = build_app_with(config).unwrap();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["capabilities"]["generator"], "gemini");
}

fn unreachable_services_app() -> Router {
    let mut gemini = GeminiConfig::new(SECRET);
    gemini.base_url = "http://127.0.0.1:9".to_string();
    gemini.timeout = Duration::from_secs(2);
    let mut maps = MapsConfig::new(SECRET);
    maps.base_url = "http://127.0.0.1:9".to_string();
    maps.timeout = Duration::from_secs(2);

    let mut config = ApiConfig::default();
    config.gemini = Some(gemini);
    config.maps = Some(maps);
    config.chat_timeout = Duration::from_secs(3);
    config.directions_timeout = Duration::from_secs(3);
    build_app_with(config).unwrap()
}

#[tokio::test]
async fn upstream_failures_never_echo_api_keys() {
    let app = unreachable_services_app();
    let here = json!({ "latitude": 28.6139, "longitude": 77.209 });

    let (status, body) = send(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "text": "What is the capital of France?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "failure");
    assert!(!body.to_string().contains(SECRET), "{body}");

    let requests = [
        (
            "/v1/routes/plan",
            json!({ "origin": here, "destination": { "latitude": 28.7, "longitude": 77.1 } }),
        ),
        (
            "/v1/places/nearby",
            json!({ "location": here, "category": "hospital" }),
        ),
        ("/v1/places/search", json!({ "query": "India Gate" })),
    ];
    for (uri, request) in requests {
        let (status, body) = send(&app, "POST", uri, Some(request)).await;
        assert!(
            status == StatusCode::BAD_GATEWAY || status == StatusCode::GATEWAY_TIMEOUT,
            "{uri}: {status}"
        );
        assert!(!body.to_string().contains(SECRET), "{uri}: {body}");
    }
}
