use relay_server::{Config, EventRouter, RelayState, Server, print_banner, setup_environment};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 日志)
    setup_environment()?;

    print_banner();

    tracing::info!("Booking relay starting...");

    // 2. 加载配置
    let config = Config::from_env();
    if config.store_id.is_none() {
        tracing::warn!("STORE_ID not set, listing fetches will be skipped");
    }

    // 3. 初始化服务状态与注入通道
    let (state, ingest_rx) = RelayState::initialize(&config)?;

    let shutdown = CancellationToken::new();

    // 4. 启动事件路由后台任务
    let router = EventRouter::new(state.engine.clone(), shutdown.clone());
    let router_task = tokio::spawn(router.run(ingest_rx));

    // 5. Ctrl-C → 优雅关闭
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    // 6. 启动 HTTP 服务
    let server = Server::new(state, shutdown.clone());
    let result = server.run().await;

    shutdown.cancel();
    let _ = router_task.await;

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}
