//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查接口
//! - [`games`] - 比赛和报名接口

pub mod games;
pub mod health;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// 组装完整路由
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(games::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
