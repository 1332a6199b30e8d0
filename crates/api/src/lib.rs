mod rate_limit;
mod sessions;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use chrono::Local;
use raksha_agents::{
    ChatAgent, Conversation, Directions, Generator, NavigationAgent, NavigationError, ReplySource,
};
use raksha_core::{
    decode_polyline, validate_contacts, ChatTurn, Classifier, ContactError, Coordinate,
    DirectionsError, DirectionsResponse, LocalMatch, MatchMode, NavigationProgress, NearbyPlace,
    PlaceCategory, Responder, ResponseCategory, RouteError, RouteSelection, SosAlert,
    SosController, SosState,
};
use raksha_observability::{AppMetrics, MetricsSnapshot};
use raksha_remote::directions::interpret_directions;
use raksha_remote::gemini::DEFAULT_CHAT_TIMEOUT;
use raksha_remote::{
    GeminiConfig, GeocodeClient, MapsConfig, PlacesClient, RemoteError, DEFAULT_DIRECTIONS_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::rate_limit::IpRateLimiter;
use crate::sessions::SessionStore;

const MAX_CHAT_TEXT_LEN: usize = 2_000;
const MAX_SEARCH_QUERY_LEN: usize = 256;
const MAX_SESSION_ID_LEN: usize = 128;
const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);
const DEFAULT_MAX_SESSIONS: usize = 10_000;
const DEFAULT_API_KEY: &str = "dev-raksha-key";
const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Runtime settings for the HTTP service, normally read from `RAKSHA_*` variables.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub app_name: String,
    pub match_mode: MatchMode,
    pub api_key: String,
    pub bind: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub session_idle_ttl: Duration,
    pub max_sessions: usize,
    pub chat_timeout: Duration,
    pub directions_timeout: Duration,
    pub gemini: Option<GeminiConfig>,
    pub maps: Option<MapsConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            app_name: raksha_core::responder::DEFAULT_APP_NAME.to_string(),
            match_mode: MatchMode::Substring,
            api_key: DEFAULT_API_KEY.to_string(),
            bind: DEFAULT_BIND.to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 80,
            session_idle_ttl: DEFAULT_SESSION_IDLE,
            max_sessions: DEFAULT_MAX_SESSIONS,
            chat_timeout: DEFAULT_CHAT_TIMEOUT,
            directions_timeout: DEFAULT_DIRECTIONS_TIMEOUT,
            gemini: None,
            maps: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let app_name = env::var("RAKSHA_APP_NAME")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.app_name);
        let match_mode = MatchMode::from_optional_str(env::var("RAKSHA_MATCH_MODE").ok().as_deref());
        let api_key = env::var("RAKSHA_API_KEY").unwrap_or(defaults.api_key);
        let bind = env::var("RAKSHA_BIND").unwrap_or(defaults.bind);
        let rate_limit_window = Duration::from_secs(
            env::var("RAKSHA_RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(60),
        );
        let rate_limit_max = env::var("RAKSHA_RATE_LIMIT_MAX")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(80);
        let session_idle_ttl = env::var("RAKSHA_SESSION_IDLE_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_idle_ttl);
        let max_sessions = env::var("RAKSHA_MAX_SESSIONS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(defaults.max_sessions);
        let gemini = GeminiConfig::from_env();
        let maps = MapsConfig::from_env();
        let chat_timeout = gemini
            .as_ref()
            .map(|config| config.timeout)
            .unwrap_or(defaults.chat_timeout);
        let directions_timeout = maps
            .as_ref()
            .map(|config| config.timeout)
            .unwrap_or(defaults.directions_timeout);

        Self {
            app_name,
            match_mode,
            api_key,
            bind,
            rate_limit_window,
            rate_limit_max,
            session_idle_ttl,
            max_sessions,
            chat_timeout,
            directions_timeout,
            gemini,
            maps,
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    chat: Arc<ChatAgent<Generator>>,
    navigation: Arc<NavigationAgent<Directions>>,
    places: Option<PlacesClient>,
    geocoder: Option<GeocodeClient>,
    metrics: Arc<AppMetrics>,
    api_key: String,
    limiter: IpRateLimiter,
    conversations: SessionStore<Conversation>,
    sos_sessions: SessionStore<SosController>,
    generator_name: &'static str,
    directions_configured: bool,
    match_mode: MatchMode,
    places_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: MetricsSnapshot,
    sessions: HealthSessions,
    capabilities: HealthCapabilities,
}

#[derive(Debug, Serialize)]
struct HealthSessions {
    chat: usize,
    sos: usize,
}

#[derive(Debug, Serialize)]
struct HealthCapabilities {
    generator: &'static str,
    directions: bool,
    nearby_places: bool,
    place_search: bool,
    match_mode: MatchMode,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    session_id: Option<String>,
    text: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    reply_text: String,
    source: ReplySource,
    category: Option<ResponseCategory>,
    local_match: Option<LocalMatch>,
    turn_count: usize,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    session_id: String,
    turns: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
struct DecodeRequest {
    encoded: String,
}

#[derive(Debug, Serialize)]
struct DecodeResponse {
    count: usize,
    points: Vec<Coordinate>,
}

#[derive(Debug, Serialize)]
struct SelectionResponse {
    #[serde(flatten)]
    selection: RouteSelection,
    bounds: Option<raksha_core::Bounds>,
}

impl From<RouteSelection> for SelectionResponse {
    fn from(selection: RouteSelection) -> Self {
        let bounds = selection.bounds();
        Self { selection, bounds }
    }
}

#[derive(Debug, Deserialize)]
struct PlanRequest {
    origin: Coordinate,
    destination: Coordinate,
}

#[derive(Debug, Deserialize)]
struct NearbyRequest {
    location: Coordinate,
    category: PlaceCategory,
}

#[derive(Debug, Serialize)]
struct NearbyPlaceView {
    #[serde(flatten)]
    place: NearbyPlace,
    distance_label: String,
}

#[derive(Debug, Serialize)]
struct NearbyResponse {
    category: PlaceCategory,
    places: Vec<NearbyPlaceView>,
}

#[derive(Debug, Deserialize)]
struct PlaceSearchRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
struct SosAlertRequest {
    sender: Option<String>,
    location: Coordinate,
    #[serde(default)]
    contacts: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SosAlertResponse {
    alert: SosAlert,
    recipients: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SosStartRequest {
    sender: Option<String>,
    #[serde(default)]
    contacts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SosLocationRequest {
    location: Coordinate,
    #[serde(default)]
    contacts: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SosSessionResponse {
    session_id: String,
    state: SosState,
    alert: Option<SosAlert>,
    recipients: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProgressRequest {
    current: Coordinate,
    destination: Coordinate,
}

pub fn build_app() -> Result<Router> {
    build_app_with(ApiConfig::from_env())
}

pub fn build_app_with(config: ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();

    let generator = Generator::from_config(config.gemini.clone())
        .context("failed to build generative-text client")?;
    let directions =
        Directions::from_config(config.maps.clone()).context("failed to build directions client")?;
    let places = config
        .maps
        .clone()
        .map(PlacesClient::new)
        .transpose()
        .context("failed to build places client")?;
    let geocoder = config
        .maps
        .clone()
        .map(GeocodeClient::new)
        .transpose()
        .context("failed to build geocoding client")?;

    let responder = Responder::new(config.app_name.clone()).with_mode(config.match_mode);
    let generator_name = generator.name();
    let directions_configured = directions.is_configured();
    info!(
        generator = generator_name,
        directions = directions_configured,
        nearby_places = places.is_some(),
        "raksha api configured"
    );
    let chat = ChatAgent::new(responder, Arc::new(generator), metrics.clone())
        .with_classifier(Classifier::with_mode(config.match_mode))
        .with_timeout(config.chat_timeout);
    let navigation = NavigationAgent::new(Arc::new(directions), metrics.clone())
        .with_timeout(config.directions_timeout);

    let state = ApiState {
        chat: Arc::new(chat),
        navigation: Arc::new(navigation),
        places,
        geocoder,
        metrics,
        api_key: config.api_key,
        limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        conversations: SessionStore::new(config.session_idle_ttl, config.max_sessions),
        sos_sessions: SessionStore::new(config.session_idle_ttl, config.max_sessions),
        generator_name,
        directions_configured,
        match_mode: config.match_mode,
        places_timeout: config.directions_timeout,
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/chat/welcome", get(chat_welcome))
        .route("/v1/chat/:session_id/history", get(chat_history))
        .route("/v1/polyline/decode", post(polyline_decode))
        .route("/v1/routes/select", post(routes_select))
        .route("/v1/routes/plan", post(routes_plan))
        .route("/v1/places/nearby", post(places_nearby))
        .route("/v1/places/search", post(places_search))
        .route("/v1/sos/alert", post(sos_alert))
        .route("/v1/sos/:session_id/start", post(sos_start))
        .route("/v1/sos/:session_id/stop", post(sos_stop))
        .route("/v1/sos/:session_id/location", post(sos_location))
        .route("/v1/navigation/progress", post(navigation_progress))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message.into()
        })),
    )
        .into_response()
}

fn validated(point: Coordinate) -> Result<Coordinate, Response> {
    Coordinate::new(point.latitude, point.longitude).map_err(|err| {
        error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_coordinate",
            err.to_string(),
        )
    })
}

fn valid_session_id(session_id: &str) -> bool {
    !session_id.trim().is_empty() && session_id.len() <= MAX_SESSION_ID_LEN
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        sessions: HealthSessions {
            chat: state.conversations.len(),
            sos: state.sos_sessions.len(),
        },
        capabilities: HealthCapabilities {
            generator: state.generator_name,
            directions: state.directions_configured,
            nearby_places: state.places.is_some(),
            place_search: state.geocoder.is_some(),
            match_mode: state.match_mode,
        },
    };
    (StatusCode::OK, Json(payload))
}

async fn chat_welcome(State(state): State<ApiState>) -> impl IntoResponse {
    let responder = state.chat.responder();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "app_name": responder.app_name(),
            "text": responder.welcome_message()
        })),
    )
}

async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    let text = request.text.trim().to_string();
    if text.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "empty_message",
            "text must not be empty",
        );
    }
    if text.chars().count() > MAX_CHAT_TEXT_LEN {
        return error_response(
            StatusCode::BAD_REQUEST,
            "message_too_long",
            format!("text must be at most {MAX_CHAT_TEXT_LEN} characters"),
        );
    }

    let session_id = request
        .session_id
        .filter(|value| valid_session_id(value))
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    state.conversations.upsert(
        &session_id,
        || state.chat.start_conversation(),
        |conversation| {
            conversation.push_user(text.as_str());
        },
    );

    let reply = state.chat.reply(&text).await;

    let turn_count = state.conversations.upsert(
        &session_id,
        || state.chat.start_conversation(),
        |conversation| {
            conversation.push_bot(reply.text.clone());
            conversation.len()
        },
    );

    (
        StatusCode::OK,
        Json(ChatResponse {
            session_id,
            reply_text: reply.text,
            source: reply.source,
            category: reply.category,
            local_match: reply.local_match,
            turn_count,
        }),
    )
        .into_response()
}

async fn chat_history(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(turns) = state
        .conversations
        .with_existing(&session_id, |conversation| conversation.turns().to_vec())
    else {
        return error_response(
            StatusCode::NOT_FOUND,
            "session_not_found",
            "no conversation exists for this session id",
        );
    };

    (StatusCode::OK, Json(HistoryResponse { session_id, turns })).into_response()
}

async fn polyline_decode(Json(request): Json<DecodeRequest>) -> Response {
    match decode_polyline(&request.encoded) {
        Ok(points) => (
            StatusCode::OK,
            Json(DecodeResponse {
                count: points.len(),
                points,
            }),
        )
            .into_response(),
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "invalid_polyline",
                "message": err.to_string(),
                "detail": err
            })),
        )
            .into_response(),
    }
}

fn route_error_response(err: RouteError) -> Response {
    match err {
        RouteError::NoRouteFound => {
            error_response(StatusCode::NOT_FOUND, "no_route_found", err.to_string())
        }
        RouteError::NoUsableRoute { ref rejected } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "no_usable_route",
                "message": err.to_string(),
                "rejected": rejected
            })),
        )
            .into_response(),
    }
}

async fn routes_select(
    State(state): State<ApiState>,
    Json(response): Json<DirectionsResponse>,
) -> Response {
    let routes = match interpret_directions(response) {
        Ok(routes) => routes,
        Err(err) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "directions_error",
                err.to_string(),
            )
        }
    };

    match state.navigation.select(&routes) {
        Ok(selection) => (StatusCode::OK, Json(SelectionResponse::from(selection))).into_response(),
        Err(err) => route_error_response(err),
    }
}

async fn routes_plan(State(state): State<ApiState>, Json(request): Json<PlanRequest>) -> Response {
    let (origin, destination) = match (validated(request.origin), validated(request.destination)) {
        (Ok(origin), Ok(destination)) => (origin, destination),
        (Err(response), _) | (_, Err(response)) => return response,
    };

    match state.navigation.plan(origin, destination).await {
        Ok(selection) => (StatusCode::OK, Json(SelectionResponse::from(selection))).into_response(),
        Err(NavigationError::Route(err)) => route_error_response(err),
        Err(err @ NavigationError::Timeout(_)) => {
            warn!(error = %err, "route planning timed out");
            error_response(StatusCode::GATEWAY_TIMEOUT, "directions_timeout", err.to_string())
        }
        Err(NavigationError::Fetch(DirectionsError::Unavailable)) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "directions_unavailable",
            "directions are not configured; set RAKSHA_MAPS_API_KEY",
        ),
        Err(err @ NavigationError::Fetch(_)) => {
            warn!(error = %err, "directions fetch failed");
            error_response(StatusCode::BAD_GATEWAY, "directions_failed", err.to_string())
        }
    }
}

fn places_error_response(err: RemoteError, action: &str) -> Response {
    match err {
        RemoteError::Places(err) => {
            warn!(error = %err, action, "maps api rejected the request");
            error_response(StatusCode::BAD_GATEWAY, "places_api_error", err.to_string())
        }
        err => {
            warn!(error = %err, action, "maps request failed");
            error_response(StatusCode::BAD_GATEWAY, "places_failed", err.to_string())
        }
    }
}

fn places_unavailable(action: &str) -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "places_unavailable",
        format!("{action} is not configured; set RAKSHA_MAPS_API_KEY"),
    )
}

async fn places_nearby(
    State(state): State<ApiState>,
    Json(request): Json<NearbyRequest>,
) -> Response {
    let location = match validated(request.location) {
        Ok(location) => location,
        Err(response) => return response,
    };
    let Some(client) = state.places.as_ref() else {
        return places_unavailable("nearby search");
    };

    state.metrics.inc_request();
    let outcome = tokio::time::timeout(
        state.places_timeout,
        client.nearby(location, request.category),
    )
    .await;

    match outcome {
        Ok(Ok(places)) => {
            info!(
                category = request.category.api_type(),
                found = places.len(),
                "nearby places listed"
            );
            let places = places
                .into_iter()
                .map(|place| NearbyPlaceView {
                    distance_label: place.distance_label(),
                    place,
                })
                .collect();
            (
                StatusCode::OK,
                Json(NearbyResponse {
                    category: request.category,
                    places,
                }),
            )
                .into_response()
        }
        Ok(Err(err)) => places_error_response(err, "nearby search"),
        Err(_) => error_response(
            StatusCode::GATEWAY_TIMEOUT,
            "places_timeout",
            "nearby search timed out",
        ),
    }
}

async fn places_search(
    State(state): State<ApiState>,
    Json(request): Json<PlaceSearchRequest>,
) -> Response {
    let query = request.query.trim();
    if query.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "empty_query",
            "query must not be empty",
        );
    }
    if query.chars().count() > MAX_SEARCH_QUERY_LEN {
        return error_response(
            StatusCode::BAD_REQUEST,
            "query_too_long",
            format!("query must be at most {MAX_SEARCH_QUERY_LEN} characters"),
        );
    }
    let Some(client) = state.geocoder.as_ref() else {
        return places_unavailable("place search");
    };

    state.metrics.inc_request();
    match tokio::time::timeout(state.places_timeout, client.search(query)).await {
        Ok(Ok(Some(found))) => {
            info!(address = %found.address, "place search matched");
            (StatusCode::OK, Json(found)).into_response()
        }
        Ok(Ok(None)) => error_response(
            StatusCode::NOT_FOUND,
            "place_not_found",
            "No results found",
        ),
        Ok(Err(err)) => places_error_response(err, "place search"),
        Err(_) => error_response(
            StatusCode::GATEWAY_TIMEOUT,
            "places_timeout",
            "place search timed out",
        ),
    }
}

fn contact_error_response(err: ContactError) -> Response {
    let code = match err {
        ContactError::Missing => "no_contacts",
        ContactError::TooFew { .. } => "too_few_contacts",
    };
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({
            "error": code,
            "message": err.to_string(),
            "detail": err
        })),
    )
        .into_response()
}

async fn sos_alert(State(state): State<ApiState>, Json(request): Json<SosAlertRequest>) -> Response {
    let location = match validated(request.location) {
        Ok(location) => location,
        Err(response) => return response,
    };
    let recipients = match validate_contacts(&request.contacts) {
        Ok(recipients) => recipients,
        Err(err) => return contact_error_response(err),
    };

    let alert = SosAlert::compose(
        request.sender.as_deref(),
        location,
        Local::now().naive_local(),
    );
    state.metrics.inc_sos_alert();
    info!(recipients = recipients.len(), "sos alert composed");

    (StatusCode::OK, Json(SosAlertResponse { alert, recipients })).into_response()
}

async fn sos_start(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    request: Option<Json<SosStartRequest>>,
) -> Response {
    if !valid_session_id(&session_id) {
        return error_response(StatusCode::BAD_REQUEST, "invalid_session", "invalid session id");
    }
    let request = request.map(|Json(body)| body).unwrap_or_default();
    if let Err(err) = validate_contacts(&request.contacts) {
        return contact_error_response(err);
    }

    let (started, sos_state) = state.sos_sessions.upsert(
        &session_id,
        SosController::new,
        |controller| (controller.start(request.sender), controller.state().clone()),
    );
    if started {
        info!(session_id = %session_id, "sos activated");
    }

    (
        StatusCode::OK,
        Json(SosSessionResponse {
            session_id,
            state: sos_state,
            alert: None,
            recipients: Vec::new(),
        }),
    )
        .into_response()
}

async fn sos_stop(State(state): State<ApiState>, Path(session_id): Path<String>) -> Response {
    let stopped = state
        .sos_sessions
        .with_existing(&session_id, SosController::stop)
        .unwrap_or(false);
    if stopped {
        info!(session_id = %session_id, "sos deactivated");
    }

    (
        StatusCode::OK,
        Json(SosSessionResponse {
            session_id,
            state: SosState::Idle,
            alert: None,
            recipients: Vec::new(),
        }),
    )
        .into_response()
}

async fn sos_location(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    Json(request): Json<SosLocationRequest>,
) -> Response {
    let location = match validated(request.location) {
        Ok(location) => location,
        Err(response) => return response,
    };
    let recipients = match validate_contacts(&request.contacts) {
        Ok(recipients) => recipients,
        Err(err) => return contact_error_response(err),
    };

    let outcome = state.sos_sessions.with_existing(&session_id, |controller| {
        let alert = controller.on_location_update(location, Local::now().naive_local());
        (alert, controller.state().clone())
    });
    let Some((alert, sos_state)) = outcome else {
        return error_response(
            StatusCode::NOT_FOUND,
            "session_not_found",
            "sos was never started for this session id",
        );
    };

    let recipients = if alert.is_some() {
        state.metrics.inc_sos_alert();
        recipients
    } else {
        Vec::new()
    };

    (
        StatusCode::OK,
        Json(SosSessionResponse {
            session_id,
            state: sos_state,
            alert,
            recipients,
        }),
    )
        .into_response()
}

async fn navigation_progress(
    State(state): State<ApiState>,
    Json(request): Json<ProgressRequest>,
) -> Response {
    let (current, destination) = match (validated(request.current), validated(request.destination)) {
        (Ok(current), Ok(destination)) => (current, destination),
        (Err(response), _) | (_, Err(response)) => return response,
    };
    let progress: NavigationProgress = state.navigation.progress(current, destination);
    (StatusCode::OK, Json(progress)).into_response()
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if request.method() == Method::OPTIONS || is_public_endpoint(path.as_str()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid x-api-key",
        );
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if request.method() == Method::OPTIONS || is_public_endpoint(path.as_str()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if let Err(retry_after) = state.limiter.check(&ip) {
        let mut response = error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded for this IP",
        );
        let seconds = retry_after.as_secs().max(1).to_string();
        if let Ok(value) = HeaderValue::from_str(&seconds) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(request).await
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health")
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "local".to_string())
}
