//! Reconciliation Engine — 三路事件流的合并裁决
//!
//! 每个入站事件经由本引擎决定 create / cancel / update / defer：
//! 读写各账本，查去重集合，调用下游连接器，再更新去重集合。
//! 所有状态驻留内存，进程重启后由后续快照重建。
//!
//! # 挂起点
//!
//! handler 只在列表拉取、下游调用和两个延迟任务处挂起。
//! 账本写入都是单次原子替换；挂起点之间的交错按 last-writer-wins
//! 接受 —— 支付/预订值是幂等快照而非计数器，分歧由下一次权威
//! 快照纠正。

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use shared::booking::{BookingOrigin, BookingRecord, BookingState};
use shared::event::{
    BookingInfoBlob, ConfirmationEvent, CustomerEvent, RevenueEvent, SnapshotEvent,
};
use shared::payload::CreateBookingPayload;

use crate::clients::{ConnectorError, Downstream, PlatformApi};
use crate::core::Config;
use crate::recon::correlator::{CustomerCorrelator, CustomerUpdate};
use crate::recon::dedup::{ForwardKind, ForwardTracker};
use crate::recon::identity::IdentityLedger;
use crate::recon::payment::PaymentLedger;
use crate::recon::pending::{PendingRevenue, PendingStore};
use crate::recon::snapshot_cache::ListingCache;
use crate::utils::clock::Clock;
use crate::utils::{AppResult, time};

pub struct ReconEngine {
    config: Config,
    tz: Tz,
    pub identity: IdentityLedger,
    pub payments: PaymentLedger,
    pub cache: ListingCache,
    pub dedup: ForwardTracker,
    pub pending: PendingStore,
    pub correlator: CustomerCorrelator,
    platform: Arc<dyn PlatformApi>,
    downstream: Arc<dyn Downstream>,
    clock: Arc<dyn Clock>,
}

impl ReconEngine {
    pub fn new(
        config: Config,
        platform: Arc<dyn PlatformApi>,
        downstream: Arc<dyn Downstream>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tz = time::parse_timezone(&config.business_timezone);
        let dedup = ForwardTracker::new(config.dedup_clear_threshold);
        Self {
            tz,
            identity: IdentityLedger::new(),
            payments: PaymentLedger::new(),
            cache: ListingCache::new(),
            dedup,
            pending: PendingStore::new(),
            correlator: CustomerCorrelator::new(),
            platform,
            downstream,
            clock,
            config,
        }
    }

    // ========================================================================
    // Confirmation Path
    // ========================================================================

    /// 处理表单确认事件
    ///
    /// 流程：状态过滤 → blob 防御解析 → 暂存创建记录 → 推测值落账 →
    /// 按 TTL 刷新快照缓存 → 消费先到的营收数据 → 快照权威覆盖 →
    /// 时间转换 → 去重检查 → 转发 create。
    pub async fn handle_confirmation(&self, ev: ConfirmationEvent) -> AppResult<()> {
        if ev.state != "success" {
            tracing::debug!(
                book_id = %ev.book_id,
                state = %ev.state,
                "Confirmation not actionable yet, dropped"
            );
            return Ok(());
        }

        let blob = Self::parse_booking_info(&ev);
        let now = self.clock.now_millis();

        // 配对窗口：营收事件可在下面的列表拉取挂起期间附着支付数据
        self.pending.insert_booking(&ev.book_id, blob.book_idx, now);

        if let Some(amount) = blob.amount
            && self.payments.seed_speculative(&ev.book_id, amount)
        {
            tracing::debug!(book_id = %ev.book_id, amount, "Seeded speculative amount from form blob");
        }

        // 按 TTL 刷新缓存；失败降级为推测值继续
        self.refresh_listing().await;

        let now = self.clock.now_millis();

        // 先到的营收数据：序号配对消费
        if let Some(idx) = blob.book_idx
            && let Some(revenue) =
                self.pending
                    .take_revenue_for_index(idx, now, self.config.pending_validity_ms)
        {
            if let Some(rid) = revenue.revenue_id.as_deref() {
                self.identity.link_revenue(rid, &ev.book_id);
            }
            self.identity.link_index(idx, &ev.book_id);
            self.payments
                .apply_revenue(&ev.book_id, revenue.amount, revenue.finished);
            tracing::info!(book_id = %ev.book_id, book_idx = idx, "Pending revenue correlated to booking");
        }

        // 拉取挂起期间附着到创建记录的支付数据
        if let Some((amount, finished)) = self.pending.attached_payment(&ev.book_id) {
            if let Some(idx) = blob.book_idx {
                self.identity.link_index(idx, &ev.book_id);
            }
            self.payments.apply_revenue(&ev.book_id, amount, finished);
        }

        // 快照命中则以快照为权威
        let cached = self.cache.find(&ev.book_id);
        match &cached {
            Some(rec) => {
                if let Some(idx) = rec.book_idx {
                    self.identity.link_index(idx, &ev.book_id);
                }
                self.payments
                    .apply_snapshot(&ev.book_id, rec.amount, rec.is_paid);
                tracing::info!(book_id = %ev.book_id, "Payment source of truth: listing snapshot");
            }
            None => {
                tracing::info!(
                    book_id = %ev.book_id,
                    "Booking absent from listing, using speculative payment values"
                );
            }
        }

        if self.dedup.seen_create(&ev.book_id) {
            tracing::debug!(book_id = %ev.book_id, "Create already forwarded, skipped");
            self.pending.remove_booking(&ev.book_id);
            return Ok(());
        }

        let payload = self.build_payload(&ev, &blob, cached.as_ref());

        // 定稿：下游调用挂起期间到达的营收不再附着到本记录
        self.pending.finalize_booking(&ev.book_id);

        match self.downstream.create(&payload).await {
            Ok(()) => {
                tracing::info!(
                    book_id = %ev.book_id,
                    amount = payload.amount,
                    paid = payload.is_paid,
                    "Create forwarded"
                );
            }
            Err(e) => {
                // 不在进程内重试：at-least-once 由事件源重投保证
                tracing::error!(book_id = %ev.book_id, error = %e, "Create forward failed, abandoned");
            }
        }
        // 确认路径无论成败都记录：同一信号的重投不得造成第二次转发
        self.dedup.record(ForwardKind::Create, &ev.book_id);
        self.pending.remove_booking(&ev.book_id);

        Ok(())
    }

    /// 防御解析内嵌 blob：畸形输入退化为默认值
    fn parse_booking_info(ev: &ConfirmationEvent) -> BookingInfoBlob {
        let Some(raw) = ev.booking_info.as_deref() else {
            return BookingInfoBlob::default();
        };
        match serde_json::from_str(raw) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(
                    book_id = %ev.book_id,
                    error = %e,
                    "Malformed bookingInfo blob, degrading to defaults"
                );
                BookingInfoBlob::default()
            }
        }
    }

    /// 组装确认路径的下游载荷：blob 字段优先，缓存记录补缺
    fn build_payload(
        &self,
        ev: &ConfirmationEvent,
        blob: &BookingInfoBlob,
        cached: Option<&BookingRecord>,
    ) -> CreateBookingPayload {
        let start_raw = blob
            .start_datetime
            .as_deref()
            .or_else(|| cached.and_then(|r| r.start_datetime.as_deref()));
        let end_raw = blob
            .end_datetime
            .as_deref()
            .or_else(|| cached.and_then(|r| r.end_datetime.as_deref()));

        let (amount, is_paid) = self.payments.resolve(&ev.book_id, blob.amount, false);

        CreateBookingPayload {
            book_id: ev.book_id.clone(),
            name: blob
                .name
                .clone()
                .or_else(|| cached.and_then(|r| r.name.clone()))
                .unwrap_or_default(),
            phone: blob
                .phone
                .clone()
                .or_else(|| cached.and_then(|r| r.phone.clone()))
                .unwrap_or_default(),
            party_size: blob
                .party_size
                .or_else(|| cached.and_then(|r| r.party_size))
                .unwrap_or(0),
            start_at: start_raw.and_then(|s| time::parse_event_datetime(s, self.tz)),
            end_at: end_raw.and_then(|s| time::parse_event_datetime(s, self.tz)),
            room_id: ev
                .room
                .clone()
                .or_else(|| cached.and_then(|r| r.room_id.clone()))
                .unwrap_or_default(),
            hole_count: blob
                .hole_count
                .or_else(|| cached.and_then(|r| r.hole_count))
                .unwrap_or(0),
            amount,
            is_paid,
            immediate: false,
        }
    }

    // ========================================================================
    // Listing Cache Refresh
    // ========================================================================

    /// 按 TTL 刷新列表缓存
    ///
    /// 缓存仍有效时跳过拉取；无门店标识时中止拉取（调用方以推测值
    /// 继续）；拉取失败只记日志。
    async fn refresh_listing(&self) {
        let now = self.clock.now_millis();
        if self.cache.is_valid(now, self.config.snapshot_ttl_ms) {
            tracing::debug!("Listing cache still fresh, fetch skipped");
            return;
        }
        let Some(store_id) = self.config.store_id.as_deref() else {
            tracing::warn!("No store id configured, listing fetch aborted");
            return;
        };

        match self.platform.fetch_listing(store_id).await {
            Ok(records) => {
                let fetched_at = self.clock.now_millis();
                self.absorb_listing(&records);
                self.cache.set(records, fetched_at);
                tracing::debug!("Listing cache refreshed");
            }
            Err(e) => {
                tracing::error!(error = %e, "Listing fetch failed, proceeding with stale or speculative data");
            }
        }
    }

    /// 快照替换的副作用：学习序号映射，以权威值覆盖支付账本
    /// （使既有推测值失效）
    fn absorb_listing(&self, records: &[BookingRecord]) {
        for rec in records {
            if let Some(idx) = rec.book_idx {
                self.identity.link_index(idx, &rec.book_id);
            }
            if rec.amount.is_some() || rec.is_paid {
                self.payments
                    .apply_snapshot(&rec.book_id, rec.amount, rec.is_paid);
            }
        }
    }

    // ========================================================================
    // Snapshot-Driven Path
    // ========================================================================

    /// 处理全量快照：刷新缓存，再做两趟清扫
    ///
    /// 取消清扫先于 App 渠道清扫完成 —— 同时可取消又可补建的预订
    /// 永远只取消（cancel wins）。
    pub async fn handle_snapshot(&self, ev: SnapshotEvent) -> AppResult<()> {
        let now = self.clock.now_millis();
        tracing::info!(count = ev.results.len(), "Snapshot listing received");

        self.absorb_listing(&ev.results);
        self.cache.set(ev.results.clone(), now);
        self.pending.prune(now, self.config.pending_validity_ms);

        self.cancellation_sweep(&ev.results).await;
        self.app_booking_sweep(&ev.results).await;
        Ok(())
    }

    /// 取消清扫：canceling/canceled 且未转发过的预订逐条 cancel
    async fn cancellation_sweep(&self, records: &[BookingRecord]) {
        for rec in records {
            if !rec.state.is_cancelish() || self.dedup.seen(&rec.book_id) {
                continue;
            }
            self.forward_cancel(rec).await;
        }
    }

    /// App 渠道清扫：支付对账 → 客户动作匹配 → cancel / create
    async fn app_booking_sweep(&self, records: &[BookingRecord]) {
        for rec in records {
            if rec.book_type != BookingOrigin::App || self.dedup.seen(&rec.book_id) {
                continue;
            }

            let now = self.clock.now_millis();
            self.reconcile_record_payment(rec, now);

            let matched = self.correlator.matches(
                rec.member_id.as_deref(),
                rec.upd_date,
                now,
                self.config.customer_match_window_ms,
            );

            if matched && rec.state.is_cancelish() {
                self.forward_cancel(rec).await;
            } else if (matched && rec.state == BookingState::Success) || rec.is_immediate {
                self.forward_record_create(rec).await;
            }
            // 其余（未匹配、不可操作）留待后续快照
        }
    }

    /// 记录的支付信息与缓存不一致时就地纠正（缓存一致性捷径），
    /// 并推入支付账本
    fn reconcile_record_payment(&self, rec: &BookingRecord, now: i64) {
        if let Some(cached) = self.cache.find(&rec.book_id)
            && (cached.amount != rec.amount || cached.is_paid != rec.is_paid)
        {
            self.cache
                .patch_payment(&rec.book_id, rec.amount, rec.is_paid, now);
            tracing::debug!(book_id = %rec.book_id, "Cached listing entry patched in place");
        }
        if rec.amount.is_some() || rec.is_paid {
            self.payments
                .apply_snapshot(&rec.book_id, rec.amount, rec.is_paid);
        }
    }

    // ========================================================================
    // Forwarding
    // ========================================================================

    /// 转发 cancel；单条失败隔离，不阻塞其余清扫
    async fn forward_cancel(&self, rec: &BookingRecord) {
        let canceled_by = rec.name.as_deref().unwrap_or("platform");
        match self.downstream.cancel(&rec.book_id, canceled_by).await {
            Ok(()) => {
                tracing::info!(book_id = %rec.book_id, "Cancel forwarded");
                self.dedup.record(ForwardKind::Cancel, &rec.book_id);
            }
            Err(ConnectorError::AlreadyCanceled) => {
                // 下游已取消视为成功
                tracing::info!(book_id = %rec.book_id, "Already canceled downstream, recorded");
                self.dedup.record(ForwardKind::Cancel, &rec.book_id);
            }
            Err(e) => {
                tracing::error!(
                    book_id = %rec.book_id,
                    error = %e,
                    "Cancel forward failed, will retry on a later snapshot"
                );
            }
        }
    }

    /// 以对账后的支付值转发 create；仅成功后记入去重集合
    async fn forward_record_create(&self, rec: &BookingRecord) {
        let payload = self.record_payload(rec);
        match self.downstream.create(&payload).await {
            Ok(()) => {
                tracing::info!(
                    book_id = %rec.book_id,
                    amount = payload.amount,
                    "Create forwarded from snapshot"
                );
                self.dedup.record(ForwardKind::Create, &rec.book_id);
            }
            Err(e) => {
                tracing::error!(
                    book_id = %rec.book_id,
                    error = %e,
                    "Create forward failed, will retry on a later snapshot"
                );
            }
        }
    }

    /// 由快照记录组装下游载荷（账本值优先）
    fn record_payload(&self, rec: &BookingRecord) -> CreateBookingPayload {
        let (amount, is_paid) = self.payments.resolve(&rec.book_id, rec.amount, rec.is_paid);
        CreateBookingPayload {
            book_id: rec.book_id.clone(),
            name: rec.name.clone().unwrap_or_default(),
            phone: rec.phone.clone().unwrap_or_default(),
            party_size: rec.party_size.unwrap_or(0),
            start_at: rec
                .start_datetime
                .as_deref()
                .and_then(|s| time::parse_event_datetime(s, self.tz)),
            end_at: rec
                .end_datetime
                .as_deref()
                .and_then(|s| time::parse_event_datetime(s, self.tz)),
            room_id: rec.room_id.clone().unwrap_or_default(),
            hole_count: rec.hole_count.unwrap_or(0),
            amount,
            is_paid,
            immediate: rec.is_immediate,
        }
    }

    // ========================================================================
    // Deferred Customer Correlation
    // ========================================================================

    /// 处理客户身份事件：过旧丢弃，重入/冷却守卫，延迟排程
    pub async fn handle_customer(self: Arc<Self>, ev: CustomerEvent) -> AppResult<()> {
        let now = self.clock.now_millis();

        let Some(upd_date) = ev.customerinfo_set.first().map(|entry| entry.upd_date) else {
            tracing::debug!(customer_id = %ev.id, "Customer event without update timestamp, dropped");
            return Ok(());
        };
        if now - upd_date > self.config.customer_freshness_ms {
            tracing::debug!(
                customer_id = %ev.id,
                age_ms = now - upd_date,
                "Customer update too old, dropped"
            );
            return Ok(());
        }

        let update = CustomerUpdate {
            id: ev.id.clone(),
            name: ev.name.clone(),
            phone: ev.phone.clone(),
            upd_date,
        };
        if !self.correlator.try_enqueue(update, now) {
            tracing::debug!(customer_id = %ev.id, "Customer already queued or cooling down, ignored");
            return Ok(());
        }

        let engine = Arc::clone(&self);
        let customer_id = ev.id;
        let delay = Duration::from_millis(self.config.correlation_delay_ms as u64);
        tokio::spawn(async move {
            engine.clock.sleep(delay).await;
            engine.run_customer_correlation(&customer_id).await;
        });
        Ok(())
    }

    /// 延迟窗口结束后为客户的预订补发 create
    ///
    /// 只在缓存仍然有效（新快照已就绪）时运行；按平台侧更新时间
    /// 降序逐条转发。
    pub async fn run_customer_correlation(&self, customer_id: &str) {
        let now = self.clock.now_millis();
        // pending 立即清除，cooldown 同时启动
        self.correlator
            .finish_run(customer_id, now, self.config.cooldown_ms);

        if !self.cache.is_valid(now, self.config.snapshot_ttl_ms) {
            tracing::debug!(customer_id, "No fresh listing cached, correlation skipped");
            return;
        }
        let Some(listing) = self.cache.get() else {
            return;
        };

        let mut candidates: Vec<BookingRecord> = listing
            .records
            .into_iter()
            .filter(|rec| rec.member_id.as_deref() == Some(customer_id))
            .filter(|rec| rec.state == BookingState::Success)
            .filter(|rec| !self.dedup.seen(&rec.book_id))
            .collect();
        candidates.sort_by(|a, b| b.upd_date.cmp(&a.upd_date));

        if candidates.is_empty() {
            tracing::debug!(customer_id, "No forwardable bookings for customer");
            return;
        }

        tracing::info!(
            customer_id,
            count = candidates.len(),
            "Forwarding correlated customer bookings"
        );
        for rec in &candidates {
            self.forward_record_create(rec).await;
        }
    }

    // ========================================================================
    // Revenue Path
    // ========================================================================

    /// 处理营收创建事件
    pub async fn handle_revenue_create(&self, ev: RevenueEvent) -> AppResult<()> {
        self.apply_revenue_event(ev, "revenue_create").await
    }

    /// 处理营收更新事件
    pub async fn handle_revenue_update(&self, ev: RevenueEvent) -> AppResult<()> {
        self.apply_revenue_event(ev, "revenue_update").await
    }

    /// 营收事件的统一处理
    ///
    /// (a) 已关联预订 → 直接更新支付账本（并纠正缓存）；
    /// (b) 未关联 → 附着到配对窗口内的创建记录；
    /// (c) 无论是否命中都按复合键暂存，迟到的预订仍可找到支付数据。
    async fn apply_revenue_event(&self, ev: RevenueEvent, stream: &'static str) -> AppResult<()> {
        let now = self.clock.now_millis();

        match self
            .identity
            .resolve(ev.revenue_id.as_deref(), Some(ev.book_idx))
        {
            Some(book_id) => {
                if let Some(rid) = ev.revenue_id.as_deref() {
                    self.identity.link_revenue(rid, &book_id);
                }
                self.payments.apply_revenue(&book_id, ev.amount, ev.finished);

                // 缓存一致性捷径
                if let Some(cached) = self.cache.find(&book_id) {
                    let amount = ev.amount.or(cached.amount);
                    let paid = cached.is_paid || ev.finished;
                    if amount != cached.amount || paid != cached.is_paid {
                        self.cache.patch_payment(&book_id, amount, paid, now);
                        tracing::debug!(book_id = %book_id, "Cached listing entry patched from revenue event");
                    }
                }
                tracing::info!(
                    stream,
                    book_id = %book_id,
                    amount = ?ev.amount,
                    finished = ev.finished,
                    "Revenue applied to ledger"
                );

                // 已转发过 create 的预订：补发 update 使下游金额收敛
                if self.dedup.seen_create(&book_id)
                    && let Some(cached) = self.cache.find(&book_id)
                {
                    let payload = self.record_payload(&cached);
                    if let Err(e) = self.downstream.update(&payload).await {
                        tracing::warn!(
                            book_id = %book_id,
                            error = %e,
                            "Payment update forward failed, abandoned"
                        );
                    }
                }
            }
            None => {
                if self.pending.attach_to_booking(
                    ev.book_idx,
                    ev.amount,
                    ev.finished,
                    now,
                    self.config.pending_validity_ms,
                ) {
                    tracing::debug!(stream, book_idx = ev.book_idx, "Revenue attached to pending booking");
                } else {
                    tracing::debug!(stream, book_idx = ev.book_idx, "No booking for revenue yet, stored as pending");
                }
            }
        }

        self.pending.insert_revenue(PendingRevenue {
            revenue_id: ev.revenue_id.clone(),
            book_idx: ev.book_idx,
            amount: ev.amount,
            finished: ev.finished,
            received_at: now,
        });

        Ok(())
    }
}
