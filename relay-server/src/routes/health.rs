//! 健康检查路由 - 公共路由 (无需认证)

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::state::RelayState;

/// 健康检查路由
pub fn router() -> Router<RelayState> {
    Router::new().route("/api/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// 门店标识（已配置时）
    #[serde(skip_serializing_if = "Option::is_none")]
    store_id: Option<String>,
    /// 列表缓存是否仍然新鲜
    listing_cache_fresh: bool,
}

/// 基础健康检查
///
/// 包含缓存新鲜度，便于捕获层判断快照流是否在正常工作
pub async fn health(State(state): State<RelayState>) -> Json<HealthResponse> {
    let now = shared::util::now_millis();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        store_id: state.config.store_id.clone(),
        listing_cache_fresh: state
            .engine
            .cache
            .is_valid(now, state.config.snapshot_ttl_ms),
    })
}
