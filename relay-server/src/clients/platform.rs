//! Platform client — HTTP client for the booking platform's listing API
//!
//! The full listing is the ground truth the reconciliation engine falls
//! back to whenever an individual event is ambiguous.

use async_trait::async_trait;
use serde::Deserialize;
use shared::booking::BookingRecord;

use crate::utils::{AppError, AppResult};

/// 平台列表拉取接口（测试注入 mock）
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// 拉取门店当前全量预订列表
    async fn fetch_listing(&self, store_id: &str) -> AppResult<Vec<BookingRecord>>;
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    results: Vec<BookingRecord>,
}

/// reqwest implementation of [`PlatformApi`]
pub struct HttpPlatformClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlatformClient {
    pub fn new(base_url: String, timeout_ms: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformClient {
    async fn fetch_listing(&self, store_id: &str) -> AppResult<Vec<BookingRecord>> {
        let url = format!("{}/api/stores/{}/bookings", self.base_url, store_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::platform(format!("Listing request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::platform(format!(
                "Listing fetch failed with status {status}: {body}"
            )));
        }

        let listing: ListingResponse = response
            .json()
            .await
            .map_err(|e| AppError::platform(format!("Failed to parse listing response: {e}")))?;

        Ok(listing.results)
    }
}
