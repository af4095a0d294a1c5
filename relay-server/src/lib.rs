//! Booking Relay - 预订事件流对账中继
//!
//! # 架构概述
//!
//! 三路异步、乱序的事件流（表单确认、全量快照、营收）描述同一个
//! 预订实体；本服务在内存中合并它们，向下游幂等接收方转发
//! 至多一次的 create / cancel 调用，金额取调用时已知的最准确值。
//!
//! # 模块结构
//!
//! ```text
//! relay-server/src/
//! ├── core/          # 配置、状态、事件路由、HTTP 服务
//! ├── routes/        # 事件注入与健康检查路由
//! ├── recon/         # 对账核心（账本、缓存、去重、配对、引擎）
//! ├── clients/       # 平台列表客户端、下游连接器
//! └── utils/         # 错误、日志、时间、时钟
//! ```

pub mod clients;
pub mod core;
pub mod recon;
pub mod routes;
pub mod utils;

// Re-export 公共类型
pub use self::core::{Config, EventRouter, RelayState, Server};
pub use recon::ReconEngine;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv, 日志)
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    let json_format = std::env::var("LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);
    let log_dir = std::env::var("LOG_DIR").ok();

    init_logger_with_file(&level, json_format, log_dir.as_deref())?;
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____  ____  __    ___  __  __
   / __ \/ __/ / /   / _ |/ / / /
  / /_/ / _/  / /__ / __ / /_/ /
 /_/|_|/___/ /____//_/ |_\__, /
                        /____/
    "#
    );
}
