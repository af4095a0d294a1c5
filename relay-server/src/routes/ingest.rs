//! 事件注入路由 - 捕获层投递已解码事件的入口
//!
//! 信封在这里一次性解码为 [`InboundEvent`]，入队交给 EventRouter；
//! 处理本身是异步的，路由立即返回。

use axum::{Json, Router, extract::State, routing::post};
use tokio::sync::mpsc::error::TrySendError;

use shared::event::InboundEvent;

use crate::core::state::RelayState;
use crate::utils::{AppError, AppResponse, ok};

/// 事件注入路由
pub fn router() -> Router<RelayState> {
    Router::new().route("/api/events", post(ingest))
}

/// 接收事件信封并入队
pub async fn ingest(
    State(state): State<RelayState>,
    Json(event): Json<InboundEvent>,
) -> Result<Json<AppResponse<()>>, AppError> {
    let stream = event.stream();
    state.ingest_tx.try_send(event).map_err(|e| match e {
        TrySendError::Full(_) => AppError::internal("Ingest queue full"),
        TrySendError::Closed(_) => AppError::internal("Ingest channel closed"),
    })?;

    tracing::debug!(stream, "Event enqueued");
    Ok(ok(()))
}
