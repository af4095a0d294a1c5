//! 集成测试公共部分：mock 客户端与测试装置
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use relay_server::clients::{ConnectorError, ConnectorResult, Downstream, PlatformApi};
use relay_server::recon::ReconEngine;
use relay_server::utils::ManualClock;
use relay_server::{AppError, AppResult, Config};
use shared::booking::BookingRecord;
use shared::payload::CreateBookingPayload;

/// 2024-01-01T00:00:00Z
pub const T0: i64 = 1_704_067_200_000;

// ============================================================================
// Mock Platform
// ============================================================================

#[derive(Default)]
pub struct MockPlatform {
    pub listing: Mutex<Vec<BookingRecord>>,
    pub fetch_count: Mutex<u32>,
    pub fail: Mutex<bool>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockPlatform {
    /// 安装拉取门闸：fetch_listing 将挂起直到 notify
    pub fn install_gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn set_listing(&self, records: Vec<BookingRecord>) {
        *self.listing.lock() = records;
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn fetch_listing(&self, _store_id: &str) -> AppResult<Vec<BookingRecord>> {
        *self.fetch_count.lock() += 1;
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if *self.fail.lock() {
            return Err(AppError::platform("mock listing failure"));
        }
        Ok(self.listing.lock().clone())
    }
}

// ============================================================================
// Mock Downstream
// ============================================================================

#[derive(Default)]
pub struct MockDownstream {
    /// 成功的 create 调用载荷
    pub creates: Mutex<Vec<CreateBookingPayload>>,
    /// 成功的 cancel 调用 (book_id, canceled_by)
    pub cancels: Mutex<Vec<(String, String)>>,
    /// 成功的 update 调用载荷
    pub updates: Mutex<Vec<CreateBookingPayload>>,
    /// 所有 create 尝试（含失败）
    pub create_attempts: Mutex<u32>,
    /// 所有 cancel 尝试（含失败）
    pub cancel_attempts: Mutex<u32>,
    pub fail_create: Mutex<bool>,
    pub fail_cancel: Mutex<bool>,
    /// cancel 时返回 AlreadyCanceled 的预订号
    pub already_canceled: Mutex<HashSet<String>>,
}

#[async_trait]
impl Downstream for MockDownstream {
    async fn create(&self, payload: &CreateBookingPayload) -> ConnectorResult<()> {
        *self.create_attempts.lock() += 1;
        if *self.fail_create.lock() {
            return Err(ConnectorError::Transport("mock create failure".into()));
        }
        self.creates.lock().push(payload.clone());
        Ok(())
    }

    async fn cancel(&self, book_id: &str, canceled_by: &str) -> ConnectorResult<()> {
        *self.cancel_attempts.lock() += 1;
        if self.already_canceled.lock().contains(book_id) {
            return Err(ConnectorError::AlreadyCanceled);
        }
        if *self.fail_cancel.lock() {
            return Err(ConnectorError::Transport("mock cancel failure".into()));
        }
        self.cancels
            .lock()
            .push((book_id.to_string(), canceled_by.to_string()));
        Ok(())
    }

    async fn update(&self, payload: &CreateBookingPayload) -> ConnectorResult<()> {
        self.updates.lock().push(payload.clone());
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: Arc<ReconEngine>,
    pub platform: Arc<MockPlatform>,
    pub downstream: Arc<MockDownstream>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// 让已唤醒的后台任务跑完当前步骤
    pub async fn settle(&self) {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }
}

pub fn make_harness() -> Harness {
    make_harness_with_config(Config::for_tests())
}

pub fn make_harness_with_config(config: Config) -> Harness {
    let platform = Arc::new(MockPlatform::default());
    let downstream = Arc::new(MockDownstream::default());
    let clock = Arc::new(ManualClock::new(T0));
    let engine = Arc::new(ReconEngine::new(
        config,
        platform.clone(),
        downstream.clone(),
        clock.clone(),
    ));
    Harness {
        engine,
        platform,
        downstream,
        clock,
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn make_record(book_id: &str) -> BookingRecord {
    BookingRecord {
        book_id: book_id.to_string(),
        ..Default::default()
    }
}
