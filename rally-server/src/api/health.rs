//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 健康检查 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (ok | error)
    status: &'static str,
    version: &'static str,
    /// 队列中待触发的任务数
    pending_jobs: u64,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let pending_jobs = state
        .jobs
        .pending_jobs()
        .map(|jobs| jobs.len() as u64)
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        pending_jobs,
    })
}
