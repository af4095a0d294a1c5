//! Event Router - 入站事件分发
//!
//! 捕获层通过 mpsc 通道投递已解码的事件，这里按流分发到引擎。
//!
//! ```text
//! ingest (HTTP / tests)
//!        │
//!        └── mpsc ──► EventRouter ──► ReconEngine::handle_*
//! ```
//!
//! ## 失败隔离
//!
//! 每个事件的处理错误只记日志：单个畸形事件不得阻塞流。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use shared::event::InboundEvent;

use crate::recon::ReconEngine;

/// 事件路由器
pub struct EventRouter {
    engine: Arc<ReconEngine>,
    shutdown: CancellationToken,
}

impl EventRouter {
    pub fn new(engine: Arc<ReconEngine>, shutdown: CancellationToken) -> Self {
        Self { engine, shutdown }
    }

    /// 运行路由器（阻塞直到通道关闭或收到关闭信号）
    pub async fn run(self, mut rx: mpsc::Receiver<InboundEvent>) {
        tracing::info!("Event router started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Event router received shutdown signal");
                    break;
                }

                maybe = rx.recv() => {
                    match maybe {
                        Some(event) => self.dispatch(event).await,
                        None => {
                            tracing::info!("Ingest channel closed, event router stopping");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Event router stopped");
    }

    /// 分发事件到引擎对应的 handler
    async fn dispatch(&self, event: InboundEvent) {
        let stream = event.stream();
        let result = match event {
            InboundEvent::Confirmation(ev) => self.engine.handle_confirmation(ev).await,
            InboundEvent::Snapshot(ev) => self.engine.handle_snapshot(ev).await,
            InboundEvent::Customer(ev) => Arc::clone(&self.engine).handle_customer(ev).await,
            InboundEvent::RevenueCreate(ev) => self.engine.handle_revenue_create(ev).await,
            InboundEvent::RevenueUpdate(ev) => self.engine.handle_revenue_update(ev).await,
        };
        if let Err(e) = result {
            tracing::error!(stream, error = %e, "Event handler failed, stream continues");
        }
    }
}
