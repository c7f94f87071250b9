use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ice_delivery_routing::{
    build_app,
    cache::MemoryCache,
    client::{ClientError, ErrorNotifier, OptimizationOutcome, RouteApiClient, SessionStore},
    config::EnvironmentConfig,
    dto::driver_dto::DriverLocationUpdate,
    repositories::MemoryDeliveryStore,
    state::AppState,
};

const PASSWORD: &str = "hielo123";

#[derive(Default)]
struct RecordingNotifier {
    errors: Mutex<Vec<ClientError>>,
}

impl RecordingNotifier {
    fn count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

impl ErrorNotifier for RecordingNotifier {
    fn notify(&self, error: &ClientError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn serve_backend() -> String {
    let store = MemoryDeliveryStore::new();
    let hash = bcrypt::hash(PASSWORD, 4).unwrap();
    store.seed_demo_data(Some(&hash)).await;

    let state = AppState::new(
        EnvironmentConfig::default(),
        Arc::new(store),
        Arc::new(MemoryCache::default()),
    )
    .unwrap();
    serve(build_app(state)).await
}

#[tokio::test]
async fn test_planned_then_nothing_to_plan_without_notification() {
    let base_url = serve_backend().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let client = RouteApiClient::new(base_url, SessionStore::new(), notifier.clone());

    client.login("gerente", PASSWORD).await.unwrap();
    assert!(client.session().token().is_some());

    match client.optimize_routes_for_location("loc_2").await.unwrap() {
        OptimizationOutcome::Planned(response) => assert_eq!(response.total_stops(), 3),
        other => panic!("expected a plan, got {:?}", other),
    }

    match client.optimize_routes_for_location("loc_2").await.unwrap() {
        OptimizationOutcome::NothingToPlan { message } => assert!(!message.is_empty()),
        other => panic!("expected nothing to plan, got {:?}", other),
    }

    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_driver_location_round_trip() {
    let base_url = serve_backend().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let client = RouteApiClient::new(base_url, SessionStore::new(), notifier.clone());
    client.login("chofer1", PASSWORD).await.unwrap();

    let ack = client
        .update_driver_location("drv_1", &DriverLocationUpdate::new(33.41, -111.83))
        .await
        .unwrap();
    assert!(ack.success);

    let location = client.get_driver_location("drv_1").await.unwrap();
    assert_eq!((location.lat, location.lng), (33.41, -111.83));

    let err = client
        .update_driver_location("drv_2", &DriverLocationUpdate::new(33.41, -111.83))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn test_backend_error_is_notified_once_and_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/api/routes/:id/progress",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "Service Unavailable", "message": "store offline" })),
                )
            }),
        )
        .with_state(hits.clone());
    let base_url = serve(router).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let client = RouteApiClient::new(base_url, SessionStore::with_token("tok"), notifier.clone());

    let err = client.get_route_progress("route_1").await.unwrap_err();
    assert!(matches!(err, ClientError::Server(_)));
    assert_eq!(err.status(), 503);
    assert_eq!(err.backend_message(), Some("store offline"));

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.count(), 1);
    // Un error que no es 401 conserva la sesión
    assert_eq!(client.session().token().as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_unprocessable_carries_backend_code() {
    let router = Router::new().route(
        "/api/routes/optimize",
        post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": "No Vehicles Available",
                    "message": "No available vehicles at location 'loc_9'",
                    "code": "NO_VEHICLES_AVAILABLE"
                })),
            )
        }),
    );
    let base_url = serve(router).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let client = RouteApiClient::new(base_url, SessionStore::with_token("tok"), notifier.clone());

    let err = client.optimize_routes_for_location("loc_9").await.unwrap_err();
    assert!(matches!(err, ClientError::Unprocessable(_)));
    assert_eq!(err.backend_code(), Some("NO_VEHICLES_AVAILABLE"));
    assert_eq!(err.user_message(), "No hay vehículos disponibles para planificar.");
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn test_network_failure_has_status_zero() {
    // Puerto reservado y liberado: nadie escucha ahí
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let notifier = Arc::new(RecordingNotifier::default());
    let client = RouteApiClient::new(format!("http://{}", addr), SessionStore::new(), notifier.clone());

    let err = client.get_driver_location("drv_1").await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert_eq!(err.status(), 0);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn test_concurrent_unauthorized_logs_out_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/api/drivers/:id/location",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Unauthorized", "message": "Token expired" })),
                )
            }),
        )
        .with_state(hits.clone());
    let base_url = serve(router).await;

    let logouts = Arc::new(AtomicUsize::new(0));
    let counter = logouts.clone();
    let session = SessionStore::with_token("expired").on_logout(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let client = RouteApiClient::new(base_url, session, notifier.clone());

    let calls = (0..5).map(|i| {
        let client = &client;
        async move { client.get_driver_location(&format!("drv_{}", i)).await }
    });
    let results = futures::future::join_all(calls).await;

    assert!(results
        .iter()
        .all(|r| matches!(r, Err(ClientError::Unauthorized(_)))));
    assert_eq!(hits.load(Ordering::SeqCst), 5);
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.count(), 5);
    assert_eq!(client.session().token(), None);
}
