//! HTTP API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 健康检查 |
//! | /api/purchase-orders | POST | 确认采购单（分配 PO 编号） |
//! | /api/purchase-returns | POST | 创建采购退货单（分配 PR 编号） |
//! | /api/documents/{id} | GET | 查询单据 |
//! | /api/numbering/check | GET | 索引与重号报告 |
//! | /api/numbering/duplicates | GET | 重号分组列表 |
//! | /api/numbering/repair | POST | 重号修复（默认 dry-run） |

pub mod documents;
pub mod health;
pub mod numbering;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(documents::router())
        .merge(numbering::router())
}

/// Router with the tower-http middleware stack
pub fn build_app(state: &ServerState) -> Router<ServerState> {
    build_router()
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_millis(state.config.request_timeout_ms),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
