use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{DrawResultView, EngagedCouple, MentorRequest};
use super::gateway::PersistenceGateway;
use super::orchestrator::DrawOrchestrator;
use crate::error::AppError;

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterCouplesRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DrawRequest {
    pub mentors: Vec<MentorRequest>,
}

#[derive(Debug, Serialize)]
struct EngagedCoupleView {
    id: String,
    name: String,
}

impl From<EngagedCouple> for EngagedCoupleView {
    fn from(couple: EngagedCouple) -> Self {
        Self {
            id: couple.id.0,
            name: couple.name,
        }
    }
}

/// Router builder exposing intake, draw, and results endpoints.
pub fn draw_router<G>(orchestrator: Arc<DrawOrchestrator<G>>) -> Router
where
    G: PersistenceGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/engaged-couples",
            post(register_handler::<G>).get(list_couples_handler::<G>),
        )
        .route("/api/v1/draws", post(draw_handler::<G>))
        .route("/api/v1/draws/latest", get(latest_handler::<G>))
        .with_state(orchestrator)
}

pub(crate) async fn register_handler<G>(
    State(orchestrator): State<Arc<DrawOrchestrator<G>>>,
    Json(request): Json<RegisterCouplesRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError>
where
    G: PersistenceGateway + 'static,
{
    let created = orchestrator.register_engaged_couples(request.names).await?;
    let couples: Vec<EngagedCoupleView> = created.into_iter().map(Into::into).collect();
    Ok((StatusCode::CREATED, Json(json!({ "couples": couples }))))
}

pub(crate) async fn list_couples_handler<G>(
    State(orchestrator): State<Arc<DrawOrchestrator<G>>>,
) -> Result<Json<serde_json::Value>, AppError>
where
    G: PersistenceGateway + 'static,
{
    let couples: Vec<EngagedCoupleView> = orchestrator
        .engaged_couples()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = couples.len();
    Ok(Json(json!({ "couples": couples, "total": total })))
}

pub(crate) async fn draw_handler<G>(
    State(orchestrator): State<Arc<DrawOrchestrator<G>>>,
    Json(request): Json<DrawRequest>,
) -> Result<(StatusCode, Json<DrawResultView>), AppError>
where
    G: PersistenceGateway + 'static,
{
    orchestrator.draw(request.mentors).await?;
    let results = orchestrator.latest_results().await?;
    Ok((StatusCode::CREATED, Json(results)))
}

pub(crate) async fn latest_handler<G>(
    State(orchestrator): State<Arc<DrawOrchestrator<G>>>,
) -> Result<Json<DrawResultView>, AppError>
where
    G: PersistenceGateway + 'static,
{
    Ok(Json(orchestrator.latest_results().await?))
}
