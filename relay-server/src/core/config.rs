//! 服务配置
//!
//! # 环境变量
//!
//! 所有配置项都可以通过环境变量覆盖：
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | HTTP_PORT | 3000 | 事件注入 HTTP 端口 |
//! | PLATFORM_URL | http://localhost:3100 | 预订平台地址（列表拉取）|
//! | DOWNSTREAM_URL | http://localhost:3200 | 下游预订系统地址 |
//! | STORE_ID | (未设置) | 平台门店标识；缺失时列表拉取中止 |
//! | BUSINESS_TIMEZONE | Asia/Seoul | 营业时区（无偏移时间串按此解释）|
//! | REQUEST_TIMEOUT_MS | 30000 | 出站请求超时（毫秒）|
//! | ENVIRONMENT | development | 运行环境 |
//! | SNAPSHOT_TTL_MS | 60000 | 快照缓存 TTL |
//! | CUSTOMER_MATCH_WINDOW_MS | 60000 | 客户动作匹配窗口 |
//! | CUSTOMER_FRESHNESS_MS | 30000 | 客户更新可操作时限 |
//! | PENDING_VALIDITY_MS | 10000 | 配对暂存有效窗口 |
//! | CORRELATION_DELAY_MS | 10000 | 延迟关联等待时长 |
//! | COOLDOWN_MS | 60000 | 同一客户重排程冷却 |
//! | DEDUP_CLEAR_THRESHOLD | 1000 | 去重集合清空阈值 |

#[derive(Debug, Clone)]
pub struct Config {
    /// 事件注入 HTTP 端口
    pub http_port: u16,
    /// 预订平台地址（列表拉取）
    pub platform_url: String,
    /// 下游预订系统地址
    pub downstream_url: String,
    /// 平台门店标识；缺失时列表拉取中止，以推测值继续
    pub store_id: Option<String>,
    /// 营业时区
    pub business_timezone: String,
    /// 出站请求超时（毫秒）
    pub request_timeout_ms: u64,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 对账窗口 ===
    /// 快照缓存 TTL（毫秒）
    pub snapshot_ttl_ms: i64,
    /// 客户动作匹配窗口（毫秒）
    pub customer_match_window_ms: i64,
    /// 客户更新可操作时限（毫秒）
    pub customer_freshness_ms: i64,
    /// 配对暂存有效窗口（毫秒）
    pub pending_validity_ms: i64,
    /// 延迟关联等待时长（毫秒）
    pub correlation_delay_ms: i64,
    /// 同一客户重排程冷却（毫秒）
    pub cooldown_ms: i64,
    /// 去重集合清空阈值
    pub dedup_clear_threshold: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            http_port: env_parse("HTTP_PORT", 3000),
            platform_url: std::env::var("PLATFORM_URL")
                .unwrap_or_else(|_| "http://localhost:3100".into()),
            downstream_url: std::env::var("DOWNSTREAM_URL")
                .unwrap_or_else(|_| "http://localhost:3200".into()),
            store_id: std::env::var("STORE_ID").ok().filter(|s| !s.is_empty()),
            business_timezone: std::env::var("BUSINESS_TIMEZONE")
                .unwrap_or_else(|_| "Asia/Seoul".into()),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 30_000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            snapshot_ttl_ms: env_parse("SNAPSHOT_TTL_MS", 60_000),
            customer_match_window_ms: env_parse("CUSTOMER_MATCH_WINDOW_MS", 60_000),
            customer_freshness_ms: env_parse("CUSTOMER_FRESHNESS_MS", 30_000),
            pending_validity_ms: env_parse("PENDING_VALIDITY_MS", 10_000),
            correlation_delay_ms: env_parse("CORRELATION_DELAY_MS", 10_000),
            cooldown_ms: env_parse("COOLDOWN_MS", 60_000),
            dedup_clear_threshold: env_parse("DEDUP_CLEAR_THRESHOLD", 1_000),
        }
    }

    /// 测试用配置：固定窗口值，不读环境
    pub fn for_tests() -> Self {
        Self {
            http_port: 0,
            platform_url: "http://platform.invalid".into(),
            downstream_url: "http://downstream.invalid".into(),
            store_id: Some("store-1".into()),
            business_timezone: "Asia/Seoul".into(),
            request_timeout_ms: 1_000,
            environment: "test".into(),
            snapshot_ttl_ms: 60_000,
            customer_match_window_ms: 60_000,
            customer_freshness_ms: 30_000,
            pending_validity_ms: 10_000,
            correlation_delay_ms: 10_000,
            cooldown_ms: 60_000,
            dedup_clear_threshold: 1_000,
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
