//! HTTP 服务 - 入站事件注入面
//!
//! 捕获层通过 `POST /api/events` 投递事件信封；健康检查公开。
//! 捕获/解码机制本身在本仓库之外。

use std::net::SocketAddr;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::core::state::RelayState;
use crate::routes;
use crate::utils::{AppError, AppResult};

pub struct Server {
    state: RelayState,
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(state: RelayState, shutdown: CancellationToken) -> Self {
        Self { state, shutdown }
    }

    /// 组装路由
    pub fn router(state: RelayState) -> Router {
        Router::new()
            .merge(routes::health::router())
            .merge(routes::ingest::router())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// 启动 HTTP 服务（阻塞直到关闭信号）
    pub async fn run(self) -> AppResult<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let app = Self::router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

        tracing::info!(%addr, "Relay server listening");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
            })
            .await
            .map_err(|e| AppError::internal(format!("Server error: {e}")))
    }
}
