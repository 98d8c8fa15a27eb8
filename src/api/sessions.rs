//! Sessions API - create, select and run combat sessions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{error, session_not_found, AppState};
use crate::combat::{CombatSession, StopOutcome, TurnEntry};

/// Session creation request
#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    name: String,
    #[serde(default)]
    campaign_id: Option<String>,
}

/// Session rename request
#[derive(Debug, Deserialize)]
struct RenameRequest {
    name: String,
}

/// Grouping flag request
#[derive(Debug, Deserialize)]
struct GroupRequest {
    enabled: bool,
}

/// Response for session list
#[derive(Debug, Serialize)]
struct SessionSummary {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    campaign_id: Option<String>,
    combatants: usize,
    started: bool,
    round: u32,
    selected: bool,
}

/// Where the fight stands after a state-machine request
#[derive(Debug, Serialize)]
struct TurnStateResponse {
    /// False when the request was a no-op (already started, nobody to act)
    changed: bool,
    started: bool,
    round: u32,
    turn_index: usize,
    active: Option<TurnEntry>,
    order: Vec<TurnEntry>,
}

impl TurnStateResponse {
    fn new(session: &CombatSession, changed: bool) -> Self {
        Self {
            changed,
            started: session.started,
            round: session.round,
            turn_index: session.turn_index,
            active: session.active_turn(),
            order: session.turn_order(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StopResponse {
    outcome: StopOutcome,
    combatants: usize,
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    removed: usize,
}

#[derive(Debug, Serialize)]
struct GroupResponse {
    name: String,
    /// Stored flag
    stored: bool,
    /// Flag after the players-never-group rule
    effective: bool,
}

/// Build the sessions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            get(list_sessions).post(create_session).delete(clear_sessions),
        )
        .route("/sessions/selected", get(selected_session))
        .route(
            "/sessions/{id}",
            get(get_session).patch(rename_session).delete(delete_session),
        )
        .route("/sessions/{id}/select", post(select_session))
        .route("/sessions/{id}/turn-order", get(turn_order))
        .route("/sessions/{id}/display", get(display_rows))
        .route("/sessions/{id}/start", post(start_combat))
        .route("/sessions/{id}/next", post(next_turn))
        .route("/sessions/{id}/stop", post(stop_combat))
        .route("/sessions/{id}/randomize", post(randomize_initiative))
        .route("/sessions/{id}/groups/{name}", put(set_group))
        .route("/sessions/{id}/groups/{name}/toggle", post(toggle_group))
}

/// GET /sessions
async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.read().await;
    let selected = store.selected_id();
    let items: Vec<SessionSummary> = store
        .list()
        .into_iter()
        .map(|s| SessionSummary {
            id: s.id.clone(),
            name: s.name.clone(),
            created_at: s.created_at,
            campaign_id: s.campaign_id.clone(),
            combatants: s.combatants.len(),
            started: s.started,
            round: s.round,
            selected: selected == Some(s.id.as_str()),
        })
        .collect();
    Json(items)
}

/// POST /sessions
/// Creates an empty session and selects it
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Response {
    let name = request.name.trim();
    if name.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Session name is required");
    }

    let mut store = state.store.write().await;
    let session = store.create_session(name, request.campaign_id);
    (StatusCode::CREATED, Json(session.clone())).into_response()
}

/// DELETE /sessions
/// Removes every session and its durable record
async fn clear_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let removed = state.store.write().await.clear_sessions();
    Json(ClearResponse { removed })
}

/// GET /sessions/selected
async fn selected_session(State(state): State<AppState>) -> Response {
    match state.store.read().await.selected() {
        Some(session) => Json(session.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "No session selected"),
    }
}

/// GET /sessions/{id}
async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.read().await.get(&id) {
        Some(session) => Json(session.clone()).into_response(),
        None => session_not_found(&id),
    }
}

/// PATCH /sessions/{id}
async fn rename_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RenameRequest>,
) -> Response {
    let mut store = state.store.write().await;
    if !store.rename_session(&id, request.name) {
        return session_not_found(&id);
    }
    match store.get(&id) {
        Some(session) => Json(session.clone()).into_response(),
        None => session_not_found(&id),
    }
}

/// DELETE /sessions/{id}
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if state.store.write().await.delete_session(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        session_not_found(&id)
    }
}

/// POST /sessions/{id}/select
async fn select_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut store = state.store.write().await;
    if !store.select_session(&id) {
        return session_not_found(&id);
    }
    match store.selected() {
        Some(session) => Json(session.clone()).into_response(),
        None => session_not_found(&id),
    }
}

/// GET /sessions/{id}/turn-order
async fn turn_order(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.read().await.get(&id) {
        Some(session) => Json(TurnStateResponse::new(session, false)).into_response(),
        None => session_not_found(&id),
    }
}

/// GET /sessions/{id}/display
/// Rows for the list view: groups in place of their members, roster order
async fn display_rows(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.read().await.display_rows(&id) {
        Some(rows) => Json(rows).into_response(),
        None => session_not_found(&id),
    }
}

/// POST /sessions/{id}/start
async fn start_combat(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut store = state.store.write().await;
    let changed = store.start_combat(&id);
    turn_state(store.get(&id), &id, changed)
}

/// POST /sessions/{id}/next
async fn next_turn(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut store = state.store.write().await;
    let changed = store.next_turn(&id);
    turn_state(store.get(&id), &id, changed)
}

/// POST /sessions/{id}/randomize
async fn randomize_initiative(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut store = state.store.write().await;
    let changed = store.randomize_initiative(&id, &mut rand::rng());
    turn_state(store.get(&id), &id, changed)
}

fn turn_state(session: Option<&CombatSession>, id: &str, changed: bool) -> Response {
    match session {
        Some(session) => Json(TurnStateResponse::new(session, changed)).into_response(),
        None => session_not_found(id),
    }
}

/// POST /sessions/{id}/stop
/// Ends a running fight; when none is running, clears the roster
async fn stop_combat(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut store = state.store.write().await;
    let Some(outcome) = store.stop_combat(&id) else {
        return session_not_found(&id);
    };
    let combatants = store.get(&id).map(|s| s.combatants.len()).unwrap_or(0);
    Json(StopResponse {
        outcome,
        combatants,
    })
    .into_response()
}

/// PUT /sessions/{id}/groups/{name}
async fn set_group(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
    Json(request): Json<GroupRequest>,
) -> Response {
    let mut store = state.store.write().await;
    if !store.set_group(&id, &name, request.enabled) {
        return session_not_found(&id);
    }
    group_state(store.get(&id), &id, name)
}

/// POST /sessions/{id}/groups/{name}/toggle
async fn toggle_group(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> Response {
    let mut store = state.store.write().await;
    if store.toggle_group(&id, &name).is_none() {
        return session_not_found(&id);
    }
    group_state(store.get(&id), &id, name)
}

fn group_state(session: Option<&CombatSession>, id: &str, name: String) -> Response {
    match session {
        Some(session) => Json(GroupResponse {
            stored: session.group_by_name.get(&name).copied().unwrap_or(true),
            effective: session.is_group_enabled(&name),
            name,
        })
        .into_response(),
        None => session_not_found(id),
    }
}
