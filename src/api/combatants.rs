//! Combatants API - roster and per-combatant field edits

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{patch, post},
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{combatant_not_found, error, session_not_found, AppState};
use crate::combat::{PlayerProfile, CUSTOM_SOURCE};
use crate::reference::resolve_or_stub;
use crate::store::SessionStore;

/// Add request: either a full creature record, or a reference to resolve
#[derive(Debug, Deserialize)]
struct AddCombatantRequest {
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

/// Field edits; absent fields are left alone.
///
/// `color` and `note` distinguish "absent" from an explicit `null`, which clears.
#[derive(Debug, Default, Deserialize)]
struct CombatantPatch {
    #[serde(default)]
    hp: Option<i32>,
    #[serde(default)]
    max_hp: Option<i32>,
    #[serde(default)]
    armor_class: Option<i32>,
    #[serde(default)]
    initiative: Option<i32>,
    #[serde(default)]
    initiative_bonus: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    color: Option<Option<String>>,
    #[serde(default)]
    conditions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    note: Option<Option<String>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    updated: usize,
}

/// Build the combatants router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions/{id}/combatants", post(add_combatant))
        .route("/sessions/{id}/players", post(add_player))
        .route(
            "/sessions/{id}/combatants/{cid}",
            patch(update_combatant).delete(remove_combatant),
        )
        .route("/players/sync", post(sync_players))
}

/// POST /sessions/{id}/combatants
/// Accepts `{"record": {...}}` or `{"name": "...", "source": "..."}`
async fn add_combatant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AddCombatantRequest>,
) -> Response {
    let record = match (request.record, request.name) {
        (Some(record), _) => record,
        (None, Some(name)) => {
            let source = request.source.unwrap_or_else(|| CUSTOM_SOURCE.to_string());
            // Resolve before taking the lock; lookups may be slow
            resolve_or_stub(state.lookup.as_ref(), &name, &source).await
        }
        (None, None) => {
            return error(StatusCode::BAD_REQUEST, "Either record or name is required");
        }
    };

    let mut store = state.store.write().await;
    match store.add_creature(&id, &record) {
        Some(cid) => created(&store, &id, &cid),
        None => session_not_found(&id),
    }
}

/// POST /sessions/{id}/players
async fn add_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(profile): Json<PlayerProfile>,
) -> Response {
    let mut store = state.store.write().await;
    match store.add_player(&id, &profile) {
        Some(cid) => created(&store, &id, &cid),
        None => session_not_found(&id),
    }
}

fn created(store: &SessionStore, id: &str, cid: &str) -> Response {
    match store.get(id).and_then(|s| s.combatant(cid)) {
        Some(c) => (StatusCode::CREATED, Json(c.clone())).into_response(),
        None => combatant_not_found(cid),
    }
}

/// POST /players/sync
/// Pushes a roster edit into every matching player combatant
async fn sync_players(
    State(state): State<AppState>,
    Json(profile): Json<PlayerProfile>,
) -> impl IntoResponse {
    let updated = state.store.write().await.sync_player_combatants(&profile);
    Json(SyncResponse { updated })
}

/// DELETE /sessions/{id}/combatants/{cid}
async fn remove_combatant(
    State(state): State<AppState>,
    Path((id, cid)): Path<(String, String)>,
) -> Response {
    let mut store = state.store.write().await;
    if store.remove_combatant(&id, &cid) {
        StatusCode::NO_CONTENT.into_response()
    } else if store.get(&id).is_none() {
        session_not_found(&id)
    } else {
        combatant_not_found(&cid)
    }
}

/// PATCH /sessions/{id}/combatants/{cid}
async fn update_combatant(
    State(state): State<AppState>,
    Path((id, cid)): Path<(String, String)>,
    Json(patch): Json<CombatantPatch>,
) -> Response {
    let mut store = state.store.write().await;
    let Some(session) = store.get(&id) else {
        return session_not_found(&id);
    };
    if session.combatant(&cid).is_none() {
        return combatant_not_found(&cid);
    }

    // Max first so a new hp is clamped against the new ceiling
    if let Some(v) = patch.max_hp {
        store.update_max_hp(&id, &cid, v);
    }
    if let Some(v) = patch.hp {
        store.update_hp(&id, &cid, v);
    }
    if let Some(v) = patch.armor_class {
        store.update_ac(&id, &cid, v);
    }
    if let Some(v) = patch.initiative {
        store.update_initiative(&id, &cid, v);
    }
    if let Some(v) = patch.initiative_bonus {
        store.update_initiative_bonus(&id, &cid, v);
    }
    if let Some(color) = patch.color {
        store.update_color(&id, &cid, color);
    }
    if let Some(conditions) = patch.conditions {
        store.update_conditions(&id, &cid, conditions);
    }
    if let Some(note) = patch.note {
        store.update_note(&id, &cid, note);
    }

    match store.get(&id).and_then(|s| s.combatant(&cid)) {
        Some(c) => Json(c.clone()).into_response(),
        None => combatant_not_found(&cid),
    }
}
