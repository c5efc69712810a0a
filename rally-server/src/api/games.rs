//! 比赛和报名路由
//!
//! 薄 HTTP 边界：反序列化、输入校验、调用引擎、映射错误码。
//! 所有业务规则都在引擎里。
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/games | POST | 创建比赛 |
//! | /api/games | GET | 列出比赛 |
//! | /api/games/{id} | GET | 查询比赛 |
//! | /api/games/{id}/registrations | GET | 查询报名 |
//! | /api/games/{id}/join | POST | 报名 |
//! | /api/games/{id}/leave | POST | 退出 |
//! | /api/games/{id}/pay | POST | 标记付款 |
//! | /api/games/{id}/close | POST | 关闭报名 |
//! | /api/games/{id}/cancel | POST | 取消比赛 |
//! | /api/games/{id}/finish | POST | 结束比赛 |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use shared::{Game, NewGame, Registration, RegistrationStatus};

use crate::core::{Result, ServerError, ServerState};

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/games", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(create_game).get(list_games))
        .route("/{id}", get(get_game))
        .route("/{id}/registrations", get(get_registrations))
        .route("/{id}/join", post(join_game))
        .route("/{id}/leave", post(leave_game))
        .route("/{id}/pay", post(mark_payment))
        .route("/{id}/close", post(close_game))
        .route("/{id}/cancel", post(cancel_game))
        .route("/{id}/finish", post(finish_game))
}

// ========== DTOs ==========

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub organizer_id: String,
    pub venue_id: String,
    /// 开始时间 (unix 毫秒, UTC)
    pub starts_at: i64,
    pub capacity: u32,
    pub level_tag: Option<String>,
    pub price_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRequest {
    pub participant_id: String,
}

#[derive(Serialize)]
pub struct JoinResponse {
    pub status: RegistrationStatus,
}

#[derive(Serialize)]
pub struct AckResponse {
    pub status: &'static str,
}

fn require_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ServerError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

// ========== Handlers ==========

async fn create_game(
    State(state): State<ServerState>,
    Json(req): Json<CreateGameRequest>,
) -> Result<Json<Game>> {
    require_non_empty(&req.organizer_id, "organizerId")?;
    require_non_empty(&req.venue_id, "venueId")?;
    if req.starts_at <= 0 {
        return Err(ServerError::Validation("startsAt must be a positive unix millis timestamp".into()));
    }

    let game = state
        .engine
        .create(NewGame {
            organizer_id: req.organizer_id,
            venue_id: req.venue_id,
            starts_at: req.starts_at,
            capacity: req.capacity,
            level_tag: req.level_tag,
            price_text: req.price_text,
        })
        .await?;
    Ok(Json(game))
}

async fn list_games(State(state): State<ServerState>) -> Result<Json<Vec<Game>>> {
    Ok(Json(state.engine.list_games()?))
}

async fn get_game(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Game>> {
    Ok(Json(state.engine.get_game(&id)?))
}

async fn get_registrations(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Registration>>> {
    Ok(Json(state.engine.registrations(&id)?))
}

async fn join_game(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<ParticipantRequest>,
) -> Result<Json<JoinResponse>> {
    require_non_empty(&req.participant_id, "participantId")?;
    let status = state.engine.join(&id, &req.participant_id).await?;
    Ok(Json(JoinResponse { status }))
}

async fn leave_game(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<ParticipantRequest>,
) -> Result<Json<AckResponse>> {
    require_non_empty(&req.participant_id, "participantId")?;
    state.engine.leave(&id, &req.participant_id).await?;
    Ok(Json(AckResponse { status: "ok" }))
}

async fn mark_payment(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<ParticipantRequest>,
) -> Result<Json<AckResponse>> {
    require_non_empty(&req.participant_id, "participantId")?;
    state.engine.mark_payment(&id, &req.participant_id).await?;
    Ok(Json(AckResponse { status: "ok" }))
}

async fn close_game(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Game>> {
    Ok(Json(state.engine.close(&id).await?))
}

async fn cancel_game(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Game>> {
    Ok(Json(state.engine.cancel(&id).await?))
}

async fn finish_game(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Game>> {
    Ok(Json(state.engine.finish(&id).await?))
}
