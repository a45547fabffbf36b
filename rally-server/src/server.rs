//! Axum server setup and router configuration.

use crate::api;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state);
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .merge(api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Add state to all routes
        .with_state(state)
}

/// CORS driven by `[cors] allowed_origins`, re-read on every request so a
/// SIGHUP reload applies without restarting. An empty list allows any
/// origin.
fn cors_layer(state: &AppState) -> CorsLayer {
    let server_config = state.config.server.clone();
    let allow_origin = AllowOrigin::async_predicate(move |origin: HeaderValue, _parts| {
        let server_config = server_config.clone();
        async move {
            let config = server_config.read().await;
            config.allowed_origins.is_empty()
                || origin
                    .to_str()
                    .is_ok_and(|origin| config.allowed_origins.iter().any(|a| a == origin))
        }
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the server with graceful shutdown support.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use rally_core::config::{AuthConfig, EventsConfig, ServerConfig, SharedConfig};
    use rally_core::store::MemoryEventStore;
    use rally_sdk::objects::{
        ApiErrorBody, ApiErrorKind, AuthResponse, EventResponse, UserSummary,
    };
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_state(allowed_origins: Vec<String>) -> AppState {
        let config = SharedConfig::new(
            ServerConfig {
                listen: "127.0.0.1:0".parse().unwrap(),
                allowed_origins,
            },
            AuthConfig::default(),
            EventsConfig::default(),
        );
        AppState::new(Arc::new(MemoryEventStore::new()), config)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> Response<Body> {
        router.clone().oneshot(req).await.unwrap()
    }

    async fn json_body<T: DeserializeOwned>(resp: Response<Body>) -> T {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn guest(router: &Router) -> AuthResponse {
        let resp = send(router, request("POST", "/api/auth/guest", None, None)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        json_body(resp).await
    }

    fn event_body(title: &str, max_attendees: Option<i32>) -> Value {
        json!({
            "title": title,
            "description": "Bring a friend",
            "date": "2030-05-01T18:00:00Z",
            "location": "Community hall",
            "category": "social",
            "maxAttendees": max_attendees,
        })
    }

    async fn create_event(router: &Router, token: &str, max_attendees: Option<i32>) -> EventResponse {
        let resp = send(
            router,
            request("POST", "/api/events", Some(token), Some(event_body("Quiz night", max_attendees))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        json_body(resp).await
    }

    async fn assert_error(resp: Response<Body>, status: StatusCode, kind: ApiErrorKind) {
        assert_eq!(resp.status(), status);
        let body: ApiErrorBody = json_body(resp).await;
        assert_eq!(body.error, kind);
    }

    #[tokio::test]
    async fn test_health() {
        let router = build_router(test_state(vec![]));
        let resp = send(&router, request("GET", "/health", None, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = json_body(resp).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_register_login_and_me() {
        let router = build_router(test_state(vec![]));
        let register = json!({"name": "Ada", "email": "ada@example.com", "password": "secret1"});

        let resp = send(&router, request("POST", "/api/auth/register", None, Some(register.clone()))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let session: AuthResponse = json_body(resp).await;

        let resp = send(&router, request("POST", "/api/auth/register", None, Some(register))).await;
        assert_error(resp, StatusCode::BAD_REQUEST, ApiErrorKind::ValidationError).await;

        let resp = send(
            &router,
            request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "ada@example.com", "password": "wrong-password"})),
            ),
        )
        .await;
        assert_error(resp, StatusCode::UNAUTHORIZED, ApiErrorKind::AuthenticationError).await;

        let resp = send(&router, request("GET", "/api/auth/me", Some(&session.token), None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let me: UserSummary = json_body(resp).await;
        assert_eq!(me, session.user);
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let router = build_router(test_state(vec![]));

        let resp = send(&router, request("POST", "/api/events", None, Some(event_body("x", None)))).await;
        assert_error(resp, StatusCode::UNAUTHORIZED, ApiErrorKind::AuthenticationError).await;

        let resp = send(&router, request("GET", "/api/auth/me", Some("not.a.token"), None)).await;
        assert_error(resp, StatusCode::UNAUTHORIZED, ApiErrorKind::AuthenticationError).await;
    }

    #[tokio::test]
    async fn test_create_and_list_events() {
        let state = test_state(vec![]);
        let router = build_router(state.clone());
        let organizer = guest(&router).await;
        let (_conn, mut rx) = state.broadcaster.register().await;

        let event = create_event(&router, &organizer.token, Some(10)).await;
        assert_eq!(event.organizer, organizer.user);
        assert!(event.attendees.is_empty());
        assert!(rx.try_recv().is_ok());

        let resp = send(&router, request("GET", "/api/events", None, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let events: Vec<EventResponse> = json_body(resp).await;
        assert_eq!(events, vec![event.clone()]);

        let uri = format!("/api/events/{}", event.id);
        let resp = send(&router, request("GET", &uri, None, None)).await;
        let fetched: EventResponse = json_body(resp).await;
        assert_eq!(fetched.id, event.id);
    }

    #[tokio::test]
    async fn test_create_event_validation() {
        let state = test_state(vec![]);
        let router = build_router(state.clone());
        let organizer = guest(&router).await;
        let (_conn, mut rx) = state.broadcaster.register().await;

        let mut body = event_body("x", None);
        body.as_object_mut().unwrap().remove("title");
        let resp = send(&router, request("POST", "/api/events", Some(&organizer.token), Some(body))).await;
        assert_error(resp, StatusCode::BAD_REQUEST, ApiErrorKind::ValidationError).await;

        let resp = send(&router, request("GET", "/api/events", None, None)).await;
        let events: Vec<EventResponse> = json_body(resp).await;
        assert!(events.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_errors() {
        let router = build_router(test_state(vec![]));
        let organizer = guest(&router).await;
        let alice = guest(&router).await;
        let bob = guest(&router).await;
        let event = create_event(&router, &organizer.token, Some(1)).await;
        let uri = format!("/api/events/{}/join", event.id);

        let resp = send(&router, request("POST", &uri, Some(&alice.token), None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let joined: EventResponse = json_body(resp).await;
        assert_eq!(joined.attendees, vec![alice.user.clone()]);

        let resp = send(&router, request("POST", &uri, Some(&alice.token), None)).await;
        assert_error(resp, StatusCode::BAD_REQUEST, ApiErrorKind::AlreadyJoined).await;

        let resp = send(&router, request("POST", &uri, Some(&bob.token), None)).await;
        assert_error(resp, StatusCode::BAD_REQUEST, ApiErrorKind::CapacityExceeded).await;

        let missing = format!("/api/events/{}/join", Uuid::new_v4());
        let resp = send(&router, request("POST", &missing, Some(&bob.token), None)).await;
        assert_error(resp, StatusCode::NOT_FOUND, ApiErrorKind::NotFound).await;

        let resp = send(&router, request("POST", "/api/events/not-a-uuid/join", Some(&bob.token), None)).await;
        assert_error(resp, StatusCode::BAD_REQUEST, ApiErrorKind::ValidationError).await;
    }

    #[tokio::test]
    async fn test_delete_event() {
        let router = build_router(test_state(vec![]));
        let organizer = guest(&router).await;
        let other = guest(&router).await;
        let event = create_event(&router, &organizer.token, None).await;
        let uri = format!("/api/events/{}", event.id);

        let resp = send(&router, request("DELETE", &uri, Some(&other.token), None)).await;
        assert_error(resp, StatusCode::FORBIDDEN, ApiErrorKind::AuthorizationError).await;

        let resp = send(&router, request("DELETE", &uri, Some(&organizer.token), None)).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(&router, request("GET", &uri, None, None)).await;
        assert_error(resp, StatusCode::NOT_FOUND, ApiErrorKind::NotFound).await;
    }

    #[tokio::test]
    async fn test_cors_follows_allowed_origins() {
        let state = test_state(vec!["https://rally.example.com".into()]);
        let router = build_router(state.clone());

        let preflight = |origin: &'static str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/api/events")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap()
        };

        let resp = send(&router, preflight("https://rally.example.com")).await;
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://rally.example.com"
        );

        let resp = send(&router, preflight("https://evil.example.com")).await;
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        state.config.server.write().await.allowed_origins = vec!["https://evil.example.com".into()];
        let resp = send(&router, preflight("https://evil.example.com")).await;
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_some());
    }

    async fn spawn_listener(state: &AppState) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state.clone());
        tokio::spawn(async move { axum::serve(listener, router).await });
        addr
    }

    /// Poll until the broadcaster holds `connections` open connections and
    /// `subscribers` members in the room of `event_id`.
    async fn wait_for_counts(
        state: &AppState,
        event_id: Uuid,
        connections: usize,
        subscribers: usize,
    ) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let broadcaster = &state.broadcaster;
                if broadcaster.connection_count().await == connections
                    && broadcaster.subscriber_count(event_id).await == subscribers
                {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    /// Drives a real listener with the SDK's live board: a join by one client
    /// shows up in another client's view through its event room.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_live_board_sees_remote_join() {
        use rally_sdk::client::{ApiClient, LiveEventBoard};
        use rally_sdk::reconciler::Applied;

        let state = test_state(vec![]);
        let addr = spawn_listener(&state).await;
        let base = url::Url::parse(&format!("http://{addr}/")).unwrap();

        let mut organizer = ApiClient::new(base.clone());
        organizer.guest_login().await.unwrap();
        let event = organizer
            .create_event(&serde_json::from_value(event_body("Hack night", Some(5))).unwrap())
            .await
            .unwrap();

        let mut viewer = ApiClient::new(base.clone());
        let me = viewer.guest_login().await.unwrap().user;
        let mut board = LiveEventBoard::open(viewer).await.unwrap();
        assert!(board.view().get(event.id).is_some());
        wait_for_counts(&state, event.id, 1, 1).await;

        let mut carol = ApiClient::new(base.clone());
        let carol_user = carol.guest_login().await.unwrap().user;
        carol.join_event(event.id).await.unwrap();

        let applied = tokio::time::timeout(Duration::from_secs(5), board.next_update())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(applied, Applied::AttendeeAdded);
        assert!(board.view().get(event.id).unwrap().has_attendee(carol_user.id));

        board.join(event.id, me.clone()).await.unwrap();
        let attendees = &board.view().get(event.id).unwrap().attendees;
        assert_eq!(attendees.len(), 2);
        assert!(attendees.contains(&me));

        board.close().await.unwrap();
        wait_for_counts(&state, event.id, 0, 0).await;
    }

    /// Joining an event the board has not listed yet adds it and enters its
    /// room, so later joins by others still arrive.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_live_board_join_unseen_event() {
        use rally_sdk::client::{ApiClient, LiveEventBoard};
        use rally_sdk::reconciler::Applied;

        let state = test_state(vec![]);
        let addr = spawn_listener(&state).await;
        let base = url::Url::parse(&format!("http://{addr}/")).unwrap();

        let mut viewer = ApiClient::new(base.clone());
        let me = viewer.guest_login().await.unwrap().user;
        let mut board = LiveEventBoard::open(viewer).await.unwrap();
        assert!(board.view().events().is_empty());

        let mut organizer = ApiClient::new(base.clone());
        organizer.guest_login().await.unwrap();
        let event = organizer
            .create_event(&serde_json::from_value(event_body("Late add", Some(5))).unwrap())
            .await
            .unwrap();

        board.join(event.id, me.clone()).await.unwrap();
        assert!(board.view().get(event.id).unwrap().attendees.contains(&me));
        wait_for_counts(&state, event.id, 1, 1).await;

        let mut carol = ApiClient::new(base.clone());
        let carol_user = carol.guest_login().await.unwrap().user;
        carol.join_event(event.id).await.unwrap();

        // The queued creation notice arrives first and changes nothing.
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let applied = board.next_update().await.unwrap().unwrap();
                if applied == Applied::AttendeeAdded {
                    break;
                }
                assert_eq!(applied, Applied::Unchanged);
            }
        })
        .await
        .unwrap();
        assert!(board.view().get(event.id).unwrap().has_attendee(carol_user.id));

        board.close().await.unwrap();
    }

    /// Raw socket behaviour of `/ws`: bad frames are answered without
    /// closing, room joins are tracked, and a dropped socket is forgotten.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ws_error_frames_and_cleanup() {
        use futures_util::{SinkExt, Stream, StreamExt};
        use rally_sdk::objects::{WsClientMessage, WsCloseCode, WsServerMessage};
        use tokio_tungstenite::tungstenite::{self, Message};

        async fn next_frame<S>(ws: &mut S) -> WsServerMessage
        where
            S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
        {
            loop {
                let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                    .await
                    .unwrap()
                    .unwrap()
                    .unwrap();
                if let Message::Text(text) = msg {
                    return serde_json::from_str(&text).unwrap();
                }
            }
        }

        let state = test_state(vec![]);
        let addr = spawn_listener(&state).await;
        let event_id = Uuid::new_v4();

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap();
        wait_for_counts(&state, event_id, 1, 0).await;

        ws.send(Message::Text("{not json".into())).await.unwrap();
        let WsServerMessage::Error { code, .. } = next_frame(&mut ws).await else {
            panic!("expected an error frame");
        };
        assert_eq!(code, WsCloseCode::MALFORMED_MESSAGE);

        ws.send(Message::Binary(vec![0xde, 0xad])).await.unwrap();
        let WsServerMessage::Error { code, .. } = next_frame(&mut ws).await else {
            panic!("expected an error frame");
        };
        assert_eq!(code, WsCloseCode::MALFORMED_MESSAGE);

        let join = WsClientMessage::JoinEventRoom { event_id };
        ws.send(Message::Text(serde_json::to_string(&join).unwrap()))
            .await
            .unwrap();
        wait_for_counts(&state, event_id, 1, 1).await;
        assert_eq!(state.broadcaster.room_count().await, 1);

        drop(ws);
        wait_for_counts(&state, event_id, 0, 0).await;
        assert_eq!(state.broadcaster.room_count().await, 0);
    }
}
