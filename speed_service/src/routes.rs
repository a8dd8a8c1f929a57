use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use hazard_engine::{
    analyze, now_ms, recommend_at, recommend_route, BoundingBox, Coordinate, Hazard, Waypoint,
};
use serde_json::{json, Value};

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::simulate::simulate;
use crate::store::HazardStore;
use crate::types::*;

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub store: HazardStore,
    pub config: Arc<ServiceConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/hazards", get(list_hazards).post(create_hazard))
        .route("/api/hazards/nearby", get(nearby_hazards))
        .route("/api/hazards/route", axum::routing::post(route_hazards))
        .route(
            "/api/hazards/:id",
            get(get_hazard).put(update_hazard).delete(delete_hazard),
        )
        .route(
            "/api/speed-recommendations",
            axum::routing::post(speed_recommendations),
        )
        .route(
            "/api/speed-recommendations/location",
            get(location_recommendation),
        )
        .route(
            "/api/speed-recommendations/route-analysis",
            axum::routing::post(route_analysis),
        )
        .route("/api/simulate", get(simulate))
        .fallback(not_found)
        .with_state(state)
}

// ---------- Validation helpers ----------

pub(crate) fn radius_or(value: Option<f64>, default: f64) -> Result<f64, ApiError> {
    let r = value.unwrap_or(default);
    if !r.is_finite() || r <= 0.0 {
        return Err(ApiError::BadRequest(format!("radius must be positive, got {}", r)));
    }
    Ok(r)
}

pub(crate) fn validate_waypoints(waypoints: &[Waypoint]) -> Result<(), ApiError> {
    if waypoints.is_empty() {
        return Err(ApiError::BadRequest("No waypoints provided".to_string()));
    }
    for wp in waypoints {
        wp.coordinate.validated()?;
        if wp.speed_limit <= 0 {
            return Err(ApiError::BadRequest(format!(
                "speed_limit must be positive, got {}",
                wp.speed_limit
            )));
        }
    }
    Ok(())
}

// ---------- Handlers ----------

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "message": "Road Hazard Detection API is running" }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}

async fn create_hazard(
    State(state): State<AppState>,
    payload: Result<Json<NewHazard>, JsonRejection>,
) -> Result<(StatusCode, Json<HazardEnvelope>), ApiError> {
    let Json(new) = payload?;
    Coordinate::try_new(new.latitude, new.longitude)?;
    if new.speed_limit <= 0 || new.recommended_speed < 0 {
        return Err(ApiError::BadRequest(
            "speed_limit must be positive and recommended_speed non-negative".to_string(),
        ));
    }
    let hazard = state.store.create(new);
    tracing::info!(
        "created hazard {} ({}/{}) on {}",
        hazard.id,
        hazard.hazard_type.as_str(),
        hazard.severity_level.as_str(),
        hazard.road_name
    );
    Ok((
        StatusCode::CREATED,
        Json(HazardEnvelope {
            message: "Hazard created successfully",
            hazard,
        }),
    ))
}

async fn list_hazards(
    State(state): State<AppState>,
    query: Result<Query<HazardQuery>, QueryRejection>,
) -> Result<Json<HazardList>, ApiError> {
    let Query(q) = query?;
    let hazards = state.store.query(&q, now_ms());
    Ok(Json(HazardList {
        count: hazards.len(),
        hazards,
    }))
}

async fn get_hazard(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Hazard>, ApiError> {
    state
        .store
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Hazard {} not found", id)))
}

async fn update_hazard(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<HazardUpdate>, JsonRejection>,
) -> Result<Json<HazardEnvelope>, ApiError> {
    let Json(update) = payload?;
    let hazard = state
        .store
        .update(id, update)
        .ok_or_else(|| ApiError::NotFound(format!("Hazard {} not found", id)))?;
    Ok(Json(HazardEnvelope {
        message: "Hazard updated successfully",
        hazard,
    }))
}

async fn delete_hazard(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .remove(id)
        .ok_or_else(|| ApiError::NotFound(format!("Hazard {} not found", id)))?;
    tracing::info!("deleted hazard {}", id);
    Ok(Json(json!({ "message": "Hazard deleted successfully" })))
}

async fn nearby_hazards(
    State(state): State<AppState>,
    query: Result<Query<NearbyQuery>, QueryRejection>,
) -> Result<Json<NearbyResponse>, ApiError> {
    let Query(q) = query?;
    let center = Coordinate::try_new(q.lat, q.lng)?;
    let radius_km = radius_or(q.radius_km, state.config.default_search_radius_km)?;
    let hazards = state.store.within(&BoundingBox::around(center, radius_km));
    Ok(Json(NearbyResponse {
        count: hazards.len(),
        hazards,
        center,
        radius_km,
    }))
}

async fn route_hazards(
    State(state): State<AppState>,
    payload: Result<Json<RouteHazardsRequest>, JsonRejection>,
) -> Result<Json<RouteHazardsResponse>, ApiError> {
    let Json(req) = payload?;
    for c in &req.waypoints {
        c.validated()?;
    }
    let buffer_km = req.buffer_km.unwrap_or(state.config.route_buffer_km);
    let bbox = BoundingBox::enclosing(req.waypoints.iter().copied(), buffer_km)
        .ok_or_else(|| ApiError::BadRequest("No waypoints provided".to_string()))?;
    let hazards = state.store.within(&bbox);
    Ok(Json(RouteHazardsResponse {
        route_info: RouteInfo {
            waypoints_count: req.waypoints.len(),
            buffer_km,
            hazards_found: hazards.len(),
        },
        hazards,
    }))
}

async fn speed_recommendations(
    State(state): State<AppState>,
    payload: Result<Json<SpeedRequest>, JsonRejection>,
) -> Result<Json<SpeedRecommendationsResponse>, ApiError> {
    let Json(req) = payload?;
    validate_waypoints(&req.waypoints)?;
    let radius_km = radius_or(req.search_radius_km, state.config.default_search_radius_km)?;
    let recommendations = recommend_route(&req.waypoints, &state.store, radius_km)?;
    Ok(Json(SpeedRecommendationsResponse {
        total_waypoints: recommendations.len(),
        recommendations,
        search_radius_km: radius_km,
    }))
}

async fn location_recommendation(
    State(state): State<AppState>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<LocationResponse>, ApiError> {
    let Query(q) = query?;
    let point = Coordinate::try_new(q.lat, q.lng)?;
    let waypoint = Waypoint::new(point, q.speed_limit.unwrap_or(hazard_engine::DEFAULT_SPEED_LIMIT));
    validate_waypoints(std::slice::from_ref(&waypoint))?;
    let radius_km = radius_or(q.radius_km, state.config.default_search_radius_km)?;
    let recommendation = recommend_at(point, waypoint.speed_limit, &state.store, radius_km)?;
    Ok(Json(LocationResponse {
        safety_status: recommendation.safety_status(),
        recommendation,
    }))
}

async fn route_analysis(
    State(state): State<AppState>,
    payload: Result<Json<SpeedRequest>, JsonRejection>,
) -> Result<Json<RouteAnalysisResponse>, ApiError> {
    let Json(req) = payload?;
    validate_waypoints(&req.waypoints)?;
    let radius_km = radius_or(req.search_radius_km, state.config.default_search_radius_km)?;
    let mut report = analyze(&req.waypoints, &state.store, radius_km)?;
    let detailed_recommendations = std::mem::take(&mut report.segments);
    Ok(Json(RouteAnalysisResponse {
        route_analysis: report,
        detailed_recommendations,
    }))
}
