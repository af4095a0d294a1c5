//! Downstream connector — HTTP client for the downstream reservation system
//!
//! Every call is idempotent on the receiving side; the relay's dedup
//! tracker is what keeps the call count down, not the connector.

use async_trait::async_trait;
use shared::payload::CreateBookingPayload;

/// 连接器错误
///
/// `AlreadyCanceled` 是 cancel 的特化响应：下游早已取消，
/// 调用方视为成功并记入去重集合。其余失败对调用方不透明。
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Booking already canceled downstream")]
    AlreadyCanceled,

    #[error("Downstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// 下游连接器接口（测试注入 mock）
#[async_trait]
pub trait Downstream: Send + Sync {
    async fn create(&self, payload: &CreateBookingPayload) -> ConnectorResult<()>;
    async fn cancel(&self, book_id: &str, canceled_by: &str) -> ConnectorResult<()>;
    async fn update(&self, payload: &CreateBookingPayload) -> ConnectorResult<()>;
}

/// reqwest implementation of [`Downstream`]
pub struct HttpDownstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDownstream {
    pub fn new(base_url: String, timeout_ms: u64) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    async fn check(response: reqwest::Response) -> ConnectorResult<()> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(ConnectorError::Status { status, body })
    }
}

#[async_trait]
impl Downstream for HttpDownstream {
    async fn create(&self, payload: &CreateBookingPayload) -> ConnectorResult<()> {
        let url = format!("{}/api/bookings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        Self::check(response).await
    }

    async fn cancel(&self, book_id: &str, canceled_by: &str) -> ConnectorResult<()> {
        let url = format!("{}/api/bookings/{}/cancel", self.base_url, book_id);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "canceled_by": canceled_by }))
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;

        // 下游用 409 表示该预订已取消
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(ConnectorError::AlreadyCanceled);
        }
        Self::check(response).await
    }

    async fn update(&self, payload: &CreateBookingPayload) -> ConnectorResult<()> {
        let url = format!("{}/api/bookings/{}", self.base_url, payload.book_id);
        let response = self
            .client
            .put(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        Self::check(response).await
    }
}
