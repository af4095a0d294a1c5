//! 服务状态 - 持有对账引擎与注入通道的共享引用
//!
//! RelayState 是整个服务的核心数据结构，使用 Arc 实现浅拷贝，
//! HTTP handler 与后台任务共享同一个引擎实例。

use std::sync::Arc;

use tokio::sync::mpsc;

use shared::event::InboundEvent;

use crate::clients::{HttpDownstream, HttpPlatformClient};
use crate::core::Config;
use crate::recon::ReconEngine;
use crate::utils::clock::SystemClock;
use crate::utils::{AppError, AppResult};

/// 注入通道容量
const INGEST_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct RelayState {
    /// 服务配置
    pub config: Config,
    /// 对账引擎
    pub engine: Arc<ReconEngine>,
    /// 注入通道发送端（路由 handler 使用）
    pub ingest_tx: mpsc::Sender<InboundEvent>,
}

impl RelayState {
    /// 初始化服务状态
    ///
    /// 按顺序构建：出站 HTTP 客户端 → 对账引擎 → 注入通道。
    /// 返回状态与注入通道接收端（交给 EventRouter）。
    pub fn initialize(config: &Config) -> AppResult<(Self, mpsc::Receiver<InboundEvent>)> {
        let platform = Arc::new(HttpPlatformClient::new(
            config.platform_url.clone(),
            config.request_timeout_ms,
        )?);
        let downstream = Arc::new(
            HttpDownstream::new(config.downstream_url.clone(), config.request_timeout_ms)
                .map_err(|e| AppError::internal(format!("Failed to build downstream client: {e}")))?,
        );
        let clock = Arc::new(SystemClock);

        let engine = Arc::new(ReconEngine::new(
            config.clone(),
            platform,
            downstream,
            clock,
        ));

        let (ingest_tx, ingest_rx) = mpsc::channel(INGEST_CHANNEL_CAPACITY);

        Ok((
            Self {
                config: config.clone(),
                engine,
                ingest_tx,
            },
            ingest_rx,
        ))
    }
}
