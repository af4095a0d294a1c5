//! Booking Snapshot Cache — 平台全量列表的 TTL 缓存
//!
//! 每次成功拉取整体替换，读者看不到部分覆盖。
//! patch 捷径允许同进程事件就地纠正单条记录的支付字段并顺延时间戳，
//! 避免同一 TTL 窗口内向并发 handler 提供已知过期的值。

use parking_lot::RwLock;
use shared::booking::BookingRecord;

#[derive(Debug, Clone)]
pub struct CachedListing {
    pub records: Vec<BookingRecord>,
    /// 拉取时间（Unix millis）
    pub fetched_at: i64,
}

#[derive(Debug, Default)]
pub struct ListingCache {
    inner: RwLock<Option<CachedListing>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// age < max_age 视为有效
    pub fn is_valid(&self, now: i64, max_age_ms: i64) -> bool {
        self.inner
            .read()
            .as_ref()
            .map(|listing| now - listing.fetched_at < max_age_ms)
            .unwrap_or(false)
    }

    pub fn get(&self) -> Option<CachedListing> {
        self.inner.read().clone()
    }

    /// 按预订号查找缓存记录
    pub fn find(&self, book_id: &str) -> Option<BookingRecord> {
        self.inner
            .read()
            .as_ref()?
            .records
            .iter()
            .find(|rec| rec.book_id == book_id)
            .cloned()
    }

    /// 整体替换
    pub fn set(&self, records: Vec<BookingRecord>, now: i64) {
        *self.inner.write() = Some(CachedListing {
            records,
            fetched_at: now,
        });
    }

    /// 就地纠正单条记录的支付字段并顺延时间戳
    ///
    /// 返回是否命中缓存记录。
    pub fn patch_payment(&self, book_id: &str, amount: Option<i64>, paid: bool, now: i64) -> bool {
        let mut guard = self.inner.write();
        let Some(listing) = guard.as_mut() else {
            return false;
        };
        let Some(rec) = listing.records.iter_mut().find(|r| r.book_id == book_id) else {
            return false;
        };
        if amount.is_some() {
            rec.amount = amount;
        }
        rec.is_paid = paid;
        listing.fetched_at = now;
        true
    }
}
