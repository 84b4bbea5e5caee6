/**
 * API REST VIBRION - Surface de lecture et CRUD moteurs
 *
 * RÔLE :
 * Expose l'état vivant aux collaborateurs externes (dashboard, export) :
 * liste moteurs, historique par moteur, journal d'audit, connectivité.
 * Les mutations (ajout/suppression moteur) du flux CRUD externe passent
 * par ici et sont soumises à la task engine.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, réponses JSON, erreurs HTTP standardisées
 * - Header x-api-key obligatoire sur toutes routes sauf /health
 * - Aucun accès mutable direct à l'état : uniquement des snapshots
 *   et des commandes engine
 */

use crate::engine::EngineHandle;
use crate::health::{HealthTracker, KernelHealth};
use crate::history::MotorSeries;
use crate::models::{EventLogEntry, Motor};
use crate::registry::AddOutcome;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;

#[derive(serde::Serialize)]
struct MotorView {
    id: String,
    name: String,
    location: String,
    status: &'static str,
    temperature: Option<f64>,
    vibration: Option<f64>,
    confidence: f64,
    last_updated: Option<String>, // RFC3339 pour l'API
}

fn to_view(m: &Motor) -> MotorView {
    MotorView {
        id: m.id.clone(),
        name: m.name.clone(),
        location: m.location.clone(),
        status: m.status.as_str(),
        temperature: m.temperature,
        vibration: m.vibration,
        confidence: m.confidence,
        last_updated: m.last_updated.and_then(|ts| ts.format(&Rfc3339).ok()),
    }
}

async fn require_api_key(req: Request, next: Next) -> Result<Response, StatusCode> {
    // Health check toujours accessible
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let expected = std::env::var("VIBRION_API_KEY").unwrap_or_default();
    if expected.is_empty() {
        eprintln!("SECURITY: VIBRION_API_KEY not set - API access denied");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub health: HealthTracker,
}

#[derive(Debug, Deserialize)]
struct AddMotorBody {
    id: String,
    name: String,
    location: String,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/motors", get(get_motors).post(add_motor))
        .route("/motors/{id}", axum::routing::delete(remove_motor))
        .route("/motors/{id}/history", get(get_history))
        .route("/log", get(get_log))
        .with_state(app_state)
        .layer(middleware::from_fn(require_api_key))
}

// GET /motors (liste)
async fn get_motors(State(app): State<AppState>) -> Result<Json<Vec<MotorView>>, StatusCode> {
    let motors = app.engine.motors().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(motors.iter().map(to_view).collect()))
}

// POST /motors (ajout depuis le flux CRUD externe)
async fn add_motor(
    State(app): State<AppState>,
    Json(body): Json<AddMotorBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let outcome = app
        .engine
        .add_motor(&body.id, &body.name, &body.location)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match outcome {
        AddOutcome::Added => Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({ "ok": true, "id": body.id })),
        )),
        AddOutcome::Duplicate => Ok((
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "ok": false, "error": "duplicate motor id or name" })),
        )),
    }
}

// DELETE /motors/{id} (idempotent : 204 même si l'id était absent)
async fn remove_motor(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    app.engine
        .remove_motor(&id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /motors/{id}/history (séries bornées pour graphiques)
async fn get_history(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MotorSeries>, StatusCode> {
    let series = app
        .engine
        .history(&id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    match series {
        Some(series) => Ok(Json(series)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

// GET /log (journal d'audit)
async fn get_log(State(app): State<AppState>) -> Result<Json<Vec<EventLogEntry>>, StatusCode> {
    let entries = app.engine.log().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(entries))
}

// GET /system/health (état infrastructure)
async fn get_system_health(State(app): State<AppState>) -> Result<Json<KernelHealth>, StatusCode> {
    let motors = app.engine.motors().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let log = app.engine.log().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(app.health.get_health(motors.len() as u32, log.len() as u32)))
}
