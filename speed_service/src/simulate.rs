use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use hazard_engine::{recommend_at, RouteSimulator, Waypoint};
use serde_json::json;

use crate::error::ApiError;
use crate::routes::{validate_waypoints, AppState};
use crate::store::HazardStore;
use crate::types::{SimulationFrame, SimulationRequest};

const DEFAULT_SIM_SPEED_KMH: f64 = 50.0;

pub async fn simulate(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

async fn handle_session(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // first text message configures the drive
    let request = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<SimulationRequest>(&text) {
                    Ok(req) => break req,
                    Err(e) => {
                        let _ = sender
                            .send(Message::Text(json!({ "error": e.to_string() }).to_string()))
                            .await;
                        return;
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::warn!("simulation socket error before start: {}", e);
                return;
            }
        }
    };

    let mut sim = match build_simulator(&request, state.config.rng_seed) {
        Ok(sim) => sim,
        Err(e) => {
            let _ = sender
                .send(Message::Text(json!({ "error": e.to_string() }).to_string()))
                .await;
            return;
        }
    };

    let tick_ms = state.config.sim_tick_ms.max(1);
    let dt_seconds = tick_ms as f64 / 1000.0;
    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
    tracing::info!(
        "simulation started: {} waypoints at {:.1} km/h",
        request.waypoints.len(),
        sim.speed_kmh()
    );

    let mut tick: u32 = 0;
    while tick < state.config.sim_max_ticks {
        tokio::select! {
            _ = interval.tick() => {
                let frame = next_frame(
                    &mut sim,
                    tick,
                    &request.waypoints,
                    &state.store,
                    state.config.default_search_radius_km,
                );
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!("failed to encode simulation frame: {}", e);
                        break;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
                sim.advance(dt_seconds);
                tick += 1;
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    }

    tracing::info!("simulation ended after {} ticks", tick);
    let _ = sender.send(Message::Close(None)).await;
}

pub(crate) fn build_simulator(
    request: &SimulationRequest,
    seed: Option<u64>,
) -> Result<RouteSimulator, ApiError> {
    validate_waypoints(&request.waypoints)?;
    let speed_kmh = request.speed_kmh.unwrap_or(DEFAULT_SIM_SPEED_KMH);
    let coords = request.waypoints.iter().map(|wp| wp.coordinate).collect();
    let sim = match seed {
        Some(seed) => RouteSimulator::seeded(coords, speed_kmh, seed)?,
        None => RouteSimulator::new(coords, speed_kmh)?,
    };
    Ok(sim)
}

/// Renders the fix for this tick and the advice at that fix.
pub(crate) fn next_frame(
    sim: &mut RouteSimulator,
    tick: u32,
    waypoints: &[Waypoint],
    store: &HazardStore,
    radius_km: f64,
) -> SimulationFrame {
    let waypoint_index = sim.current_waypoint_index();
    let speed_limit = waypoints
        .get(waypoint_index)
        .map_or(hazard_engine::DEFAULT_SPEED_LIMIT, |wp| wp.speed_limit);
    let fix = sim.current_position();
    let recommendation = match recommend_at(fix.coordinate(), speed_limit, store, radius_km) {
        Ok(rec) => rec,
        Err(never) => match never {},
    };
    SimulationFrame {
        tick,
        waypoint_index,
        progress: sim.progress(),
        finished: sim.is_finished(),
        fix,
        recommendation,
    }
}
