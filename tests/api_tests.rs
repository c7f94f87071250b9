use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceExt;

use ice_delivery_routing::{
    build_app,
    cache::MemoryCache,
    config::EnvironmentConfig,
    models::{User, UserRole},
    repositories::MemoryDeliveryStore,
    state::AppState,
    utils::jwt::generate_token,
};

const PASSWORD: &str = "hielo123";

struct TestApp {
    router: Router,
    manager: String,
    driver_1: String,
}

async fn create_test_app() -> TestApp {
    let store = MemoryDeliveryStore::new();
    let hash = bcrypt::hash(PASSWORD, 4).unwrap();
    store.seed_demo_data(Some(&hash)).await;

    let state = AppState::new(
        EnvironmentConfig::default(),
        Arc::new(store),
        Arc::new(MemoryCache::default()),
    )
    .unwrap();

    let manager = token_for(&state, "usr_1", UserRole::Manager, None);
    let driver_1 = token_for(&state, "usr_2", UserRole::Driver, Some("drv_1"));

    TestApp {
        router: build_app(state),
        manager,
        driver_1,
    }
}

fn token_for(state: &AppState, id: &str, role: UserRole, driver_id: Option<&str>) -> String {
    let user = User {
        id: id.to_string(),
        username: id.to_string(),
        password_hash: String::new(),
        role,
        driver_id: driver_id.map(str::to_string),
    };
    generate_token(&user, &state.jwt).unwrap()
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
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

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };
        (status, value)
    }

    async fn optimize(&self, location_id: &str) -> (StatusCode, Value) {
        let uri = format!("/api/routes/optimize?location_id={}", location_id);
        self.call(Method::POST, &uri, Some(&self.manager), None).await
    }
}

fn stop_order_ids(body: &Value) -> Vec<String> {
    body["routes"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|r| r["stops"].as_array().unwrap().iter())
        .map(|s| s["order_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"]["backend"], "memory");
}

#[tokio::test]
async fn test_api_requires_token() {
    let app = create_test_app().await;

    let (status, _) = app.call(Method::POST, "/api/routes/optimize?location_id=loc_2", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/routes", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_driver_cannot_optimize() {
    let app = create_test_app().await;
    let (status, body) = app
        .call(Method::POST, "/api/routes/optimize?location_id=loc_2", Some(&app.driver_1), None)
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_optimize_routes_every_pending_order_once() {
    let app = create_test_app().await;
    let (status, body) = app.optimize("loc_2").await;

    assert_eq!(status, StatusCode::OK);
    let routes = body["routes"].as_array().unwrap();
    assert!(!routes.is_empty());

    let order_ids = stop_order_ids(&body);
    assert_eq!(order_ids.len(), 3);
    let unique: HashSet<_> = order_ids.iter().cloned().collect();
    let expected: HashSet<_> = ["ord_4", "ord_5", "ord_6"].iter().map(|s| s.to_string()).collect();
    assert_eq!(unique, expected);

    for route in routes {
        let numbers: Vec<i64> = route["stops"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["stop_number"].as_i64().unwrap())
            .collect();
        let expected: Vec<i64> = (1..=numbers.len() as i64).collect();
        assert_eq!(numbers, expected);
        assert_eq!(route["status"], "planned");
        assert_eq!(route["location_id"], "loc_2");
    }
}

#[tokio::test]
async fn test_second_optimize_does_not_reroute_orders() {
    let app = create_test_app().await;
    let (status, _) = app.optimize("loc_2").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.optimize("loc_2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["routes"], json!([]));
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_optimize_unknown_location_is_not_found() {
    let app = create_test_app().await;
    let (status, body) = app.optimize("loc_404").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_optimize_body_form_and_mismatch() {
    let app = create_test_app().await;

    let body = json!({
        "location_id": "loc_2",
        "orders": [{ "id": "ord_5", "customer_id": "cust_5", "quantity": 60 }]
    });
    let (status, response) = app
        .call(Method::POST, "/api/routes/optimize?location_id=loc_1", Some(&app.manager), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "BAD_REQUEST");

    let (status, response) = app
        .call(Method::POST, "/api/routes/optimize", Some(&app.manager), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stop_order_ids(&response), vec!["ord_5".to_string()]);
}

#[tokio::test]
async fn test_route_status_transitions_and_cancel_releases_orders() {
    let app = create_test_app().await;
    let (_, body) = app.optimize("loc_1").await;
    let route = &body["routes"][0];
    let route_id = route["id"].as_str().unwrap().to_string();
    let routed: Vec<String> = route["stops"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["order_id"].as_str().unwrap().to_string())
        .collect();
    let status_uri = format!("/api/routes/{}/status", route_id);

    // planned -> completed no es una transición válida
    let (status, _) = app
        .call(Method::PATCH, &status_uri, Some(&app.manager), Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, response) = app
        .call(Method::PATCH, &status_uri, Some(&app.manager), Some(json!({ "status": "active" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "active");

    let (status, response) = app
        .call(Method::PATCH, &status_uri, Some(&app.manager), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "cancelled");

    let (status, response) = app
        .call(Method::GET, "/api/orders?location_id=loc_1&status=pending", Some(&app.manager), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let pending: HashSet<String> = response["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap().to_string())
        .collect();
    for order_id in routed {
        assert!(pending.contains(&order_id), "{} should be pending again", order_id);
    }
}

#[tokio::test]
async fn test_complete_stops_then_route() {
    let app = create_test_app().await;
    let (_, body) = app.optimize("loc_2").await;
    let route = body["routes"][0].clone();
    let route_id = route["id"].as_str().unwrap();
    let stops = route["stops"].as_array().unwrap();

    // Una ruta planificada no admite cerrar paradas
    let first_stop = stops[0]["id"].as_str().unwrap();
    let complete_uri = format!("/api/routes/{}/stops/{}/complete", route_id, first_stop);
    let (status, _) = app.call(Method::POST, &complete_uri, Some(&app.manager), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let status_uri = format!("/api/routes/{}/status", route_id);
    app.call(Method::PATCH, &status_uri, Some(&app.manager), Some(json!({ "status": "active" })))
        .await;

    // La ruta no es de drv_1
    let (status, _) = app.call(Method::POST, &complete_uri, Some(&app.driver_1), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for stop in stops {
        let uri = format!("/api/routes/{}/stops/{}/complete", route_id, stop["id"].as_str().unwrap());
        let (status, _) = app.call(Method::POST, &uri, Some(&app.manager), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, progress) = app
        .call(Method::GET, &format!("/api/routes/{}/progress", route_id), Some(&app.manager), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["completed_stops"], json!(stops.len()));

    let (status, response) = app
        .call(Method::PATCH, &status_uri, Some(&app.manager), Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "completed");
}

#[tokio::test]
async fn test_waypoints_keep_backend_order() {
    let app = create_test_app().await;
    let (_, body) = app.optimize("loc_2").await;
    let route = &body["routes"][0];
    let route_id = route["id"].as_str().unwrap();
    let stop_count = route["stops"].as_array().unwrap().len();

    let (status, response) = app
        .call(Method::GET, &format!("/api/routes/{}/waypoints", route_id), Some(&app.driver_1), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["optimize_waypoints"], false);
    assert!(response.get("directions").map_or(true, Value::is_null));

    let waypoints = response["waypoints"].as_array().unwrap();
    assert_eq!(waypoints.len(), stop_count + 2);
    assert_eq!(waypoints[0]["kind"], "depot");
    for (i, waypoint) in waypoints[1..=stop_count].iter().enumerate() {
        assert_eq!(waypoint["stop_number"], json!(i + 1));
    }
}

#[tokio::test]
async fn test_driver_location_flow() {
    let app = create_test_app().await;

    let (status, ack) = app
        .call(
            Method::POST,
            "/api/drivers/drv_1/location",
            Some(&app.driver_1),
            Some(json!({ "lat": 33.45, "lng": -112.07, "speed": 35.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/drivers/drv_2/location",
            Some(&app.driver_1),
            Some(json!({ "lat": 33.45, "lng": -112.07 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, location) = app
        .call(Method::GET, "/api/drivers/drv_1/location", Some(&app.manager), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(location["lat"], 33.45);

    let (status, _) = app
        .call(Method::GET, "/api/drivers/drv_9/location", Some(&app.manager), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_issues_usable_token() {
    let app = create_test_app().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "gerente", "password": "incorrecta" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "gerente", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "manager");

    let token = body["token"].as_str().unwrap();
    let (status, _) = app.call(Method::GET, "/api/routes", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_order_then_plan_it() {
    let app = create_test_app().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(&app.driver_1),
            Some(json!({ "customer_id": "cust_5", "quantity": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(&app.manager),
            Some(json!({ "customer_id": "cust_5", "quantity": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["location_id"], "loc_2");
    assert_eq!(body["data"]["status"], "pending");

    let (_, plan) = app.optimize("loc_2").await;
    assert!(stop_order_ids(&plan).contains(&order_id));
}

#[tokio::test]
async fn test_metrics_count_optimizations() {
    let app = create_test_app().await;
    app.optimize("loc_2").await;
    app.optimize("loc_2").await;

    let (status, body) = app.call(Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("route_optimizations_total{outcome=\"planned\"} 1"));
    assert!(text.contains("route_optimizations_total{outcome=\"empty\"} 1"));
}
