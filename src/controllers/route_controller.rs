//! Controlador de rutas
//!
//! Este módulo maneja los endpoints de optimización y seguimiento de rutas.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::Json,
    Extension,
};

use crate::dto::api_response::ApiResponse;
use crate::dto::route_dto::{OptimizeQuery, OptimizeRouteRequest, OptimizeRouteResponse, UpdateRouteStatusRequest, WaypointsResponse};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Route, RouteFilters, RouteProgress, UserRole};
use crate::services::{DirectionsService, RouteOptimizationService, RouteTrackingService};
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, not_found_error, AppError};

/// Optimizar rutas de una ubicación
///
/// Acepta `?location_id=` o un cuerpo JSON `{orders, location_id,
/// vehicle_count?, date?}`. Si vienen ambos, manda el cuerpo y los
/// `location_id` deben coincidir.
pub async fn optimize_routes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<OptimizeQuery>,
    body: Bytes,
) -> Result<Json<OptimizeRouteResponse>, AppError> {
    user.require_role(&[UserRole::Manager], "optimize routes")?;

    let request = optimize_request(query, &body)?;
    log::info!("🎯 Solicitud de optimización para {} por {}", request.location_id, user.user_id);

    let timer = state.metrics.optimization_duration.start_timer();
    let result = RouteOptimizationService::from_state(&state).optimize(request).await;
    timer.observe_duration();

    let outcome = match &result {
        Ok(response) if response.routes.is_empty() => "empty",
        Ok(_) => "planned",
        Err(AppError::NoVehiclesAvailable(_)) => "no_vehicles",
        Err(AppError::Infeasible { .. }) => "infeasible",
        Err(AppError::Conflict(_)) => "conflict",
        Err(_) => "error",
    };
    state.metrics.record_optimization(outcome);

    let response = result?;
    state.metrics.routes_created.inc_by(response.routes.len() as u64);

    Ok(Json(response))
}

fn optimize_request(query: OptimizeQuery, body: &[u8]) -> Result<OptimizeRouteRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        let location_id = query
            .location_id
            .ok_or_else(|| bad_request_error("location_id is required"))?;

        return Ok(OptimizeRouteRequest {
            orders: None,
            location_id,
            vehicle_count: query.vehicle_count,
            date: query.date,
        });
    }

    let mut request: OptimizeRouteRequest =
        serde_json::from_slice(body).map_err(|e| bad_request_error(&format!("Invalid JSON body: {}", e)))?;

    if let Some(location_id) = &query.location_id {
        if location_id != &request.location_id {
            return Err(bad_request_error(&format!(
                "location_id mismatch between query ('{}') and body ('{}')",
                location_id, request.location_id
            )));
        }
    }

    request.vehicle_count = request.vehicle_count.or(query.vehicle_count);
    request.date = request.date.or(query.date);

    Ok(request)
}

/// Listar rutas con filtros opcionales
pub async fn list_routes(
    State(state): State<AppState>,
    Query(filters): Query<RouteFilters>,
) -> Result<Json<ApiResponse<Vec<Route>>>, AppError> {
    let routes = RouteTrackingService::new(state.store.clone()).list_routes(&filters).await?;
    Ok(Json(ApiResponse::success(routes)))
}

pub async fn get_route(State(state): State<AppState>, Path(route_id): Path<String>) -> Result<Json<Route>, AppError> {
    let route = RouteTrackingService::new(state.store.clone()).get_route(&route_id).await?;
    Ok(Json(route))
}

pub async fn get_route_progress(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> Result<Json<RouteProgress>, AppError> {
    let progress = RouteTrackingService::new(state.store.clone())
        .get_route_progress(&route_id)
        .await?;
    Ok(Json(progress))
}

pub async fn update_route_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(route_id): Path<String>,
    Json(request): Json<UpdateRouteStatusRequest>,
) -> Result<Json<Route>, AppError> {
    user.require_role(&[UserRole::Manager], "change route status")?;

    let route = RouteTrackingService::new(state.store.clone())
        .update_route_status(&route_id, request.status)
        .await?;
    Ok(Json(route))
}

pub async fn complete_stop(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((route_id, stop_id)): Path<(String, String)>,
) -> Result<Json<Route>, AppError> {
    user.require_role(&[UserRole::Manager, UserRole::Driver], "complete stop")?;

    let route = RouteTrackingService::new(state.store.clone())
        .complete_stop(&user, &route_id, &stop_id)
        .await?;
    Ok(Json(route))
}

/// Puntos de paso en orden fijo para el mapa
pub async fn get_route_waypoints(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> Result<Json<WaypointsResponse>, AppError> {
    let route = RouteTrackingService::new(state.store.clone()).get_route(&route_id).await?;
    let depot = state
        .store
        .get_location(&route.location_id)
        .await?
        .ok_or_else(|| not_found_error("Location", &route.location_id))?;

    let response = DirectionsService::from_state(&state).route_waypoints(&route, &depot).await;
    Ok(Json(response))
}
