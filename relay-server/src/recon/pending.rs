//! Pending Update Store — 先到事件的暂存记录
//!
//! 支付先于预订、或预订先于支付到达时，以复合键暂存对方所需的数据；
//! 配对成功即消费，超过有效窗口（默认 10s）丢弃。

use std::collections::HashMap;

use parking_lot::Mutex;

/// 暂存的营收数据（支付先到）
#[derive(Debug, Clone)]
pub struct PendingRevenue {
    pub revenue_id: Option<String>,
    pub book_idx: i64,
    pub amount: Option<i64>,
    pub finished: bool,
    /// 到达时间（Unix millis）
    pub received_at: i64,
}

/// 暂存的预订创建记录（预订先到，等待配对窗口内的营收数据）
#[derive(Debug, Clone)]
pub struct PendingBooking {
    pub book_id: String,
    pub book_idx: Option<i64>,
    /// 窗口内附加的支付数据 (amount, finished)
    pub attached: Option<(Option<i64>, bool)>,
    /// 定稿后不再接受附加
    pub finalized: bool,
    pub received_at: i64,
}

#[derive(Debug, Default)]
pub struct PendingStore {
    /// 营收暂存：复合键，按标识与序号各存一份
    revenue_by_id: Mutex<HashMap<String, PendingRevenue>>,
    revenue_by_idx: Mutex<HashMap<i64, PendingRevenue>>,
    bookings: Mutex<HashMap<String, PendingBooking>>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== 营收侧 ==========

    /// 暂存营收数据；同键后写覆盖先写
    pub fn insert_revenue(&self, revenue: PendingRevenue) {
        if let Some(rid) = revenue.revenue_id.as_deref() {
            self.revenue_by_id
                .lock()
                .insert(rid.to_string(), revenue.clone());
        }
        self.revenue_by_idx.lock().insert(revenue.book_idx, revenue);
    }

    /// 按序号取走有效窗口内的营收暂存（消费语义）
    pub fn take_revenue_for_index(
        &self,
        idx: i64,
        now: i64,
        validity_ms: i64,
    ) -> Option<PendingRevenue> {
        let revenue = self.revenue_by_idx.lock().remove(&idx)?;
        if let Some(rid) = revenue.revenue_id.as_deref() {
            self.revenue_by_id.lock().remove(rid);
        }
        if now - revenue.received_at >= validity_ms {
            // 过期即丢弃
            return None;
        }
        Some(revenue)
    }

    // ========== 预订侧 ==========

    pub fn insert_booking(&self, book_id: &str, book_idx: Option<i64>, now: i64) {
        self.bookings.lock().insert(
            book_id.to_string(),
            PendingBooking {
                book_id: book_id.to_string(),
                book_idx,
                attached: None,
                finalized: false,
                received_at: now,
            },
        );
    }

    /// 营收事件附着到同序号、未定稿、有效窗口内的创建记录
    pub fn attach_to_booking(
        &self,
        idx: i64,
        amount: Option<i64>,
        finished: bool,
        now: i64,
        validity_ms: i64,
    ) -> bool {
        let mut bookings = self.bookings.lock();
        let Some(booking) = bookings.values_mut().find(|b| {
            !b.finalized && b.book_idx == Some(idx) && now - b.received_at < validity_ms
        }) else {
            return false;
        };
        booking.attached = Some((amount, finished));
        true
    }

    /// 读取创建记录上附加的支付数据
    pub fn attached_payment(&self, book_id: &str) -> Option<(Option<i64>, bool)> {
        self.bookings.lock().get(book_id).and_then(|b| b.attached)
    }

    /// 转发前定稿：之后到达的营收不再附着到本记录
    pub fn finalize_booking(&self, book_id: &str) {
        if let Some(booking) = self.bookings.lock().get_mut(book_id) {
            booking.finalized = true;
        }
    }

    pub fn remove_booking(&self, book_id: &str) {
        self.bookings.lock().remove(book_id);
    }

    // ========== 清理 ==========

    /// 丢弃超过有效窗口的暂存记录
    pub fn prune(&self, now: i64, validity_ms: i64) {
        self.revenue_by_id
            .lock()
            .retain(|_, r| now - r.received_at < validity_ms);
        self.revenue_by_idx
            .lock()
            .retain(|_, r| now - r.received_at < validity_ms);
        self.bookings
            .lock()
            .retain(|_, b| now - b.received_at < validity_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_revenue(idx: i64, amount: i64, received_at: i64) -> PendingRevenue {
        PendingRevenue {
            revenue_id: Some(format!("R{idx}")),
            book_idx: idx,
            amount: Some(amount),
            finished: false,
            received_at,
        }
    }

    #[test]
    fn test_take_revenue_within_validity() {
        let store = PendingStore::new();
        store.insert_revenue(make_revenue(7, 5_000, 0));

        let taken = store.take_revenue_for_index(7, 9_999, 10_000).unwrap();
        assert_eq!(taken.amount, Some(5_000));
        // 消费后再取为空
        assert!(store.take_revenue_for_index(7, 9_999, 10_000).is_none());
    }

    #[test]
    fn test_take_revenue_expired_is_dropped() {
        let store = PendingStore::new();
        store.insert_revenue(make_revenue(7, 5_000, 0));
        assert!(store.take_revenue_for_index(7, 10_000, 10_000).is_none());
    }

    #[test]
    fn test_attach_requires_matching_index_and_window() {
        let store = PendingStore::new();
        store.insert_booking("B1", Some(7), 0);

        assert!(!store.attach_to_booking(8, Some(5_000), true, 100, 10_000));
        assert!(!store.attach_to_booking(7, Some(5_000), true, 10_000, 10_000));
        assert!(store.attach_to_booking(7, Some(5_000), true, 100, 10_000));
        assert_eq!(store.attached_payment("B1"), Some((Some(5_000), true)));
    }

    #[test]
    fn test_finalized_booking_rejects_attach() {
        let store = PendingStore::new();
        store.insert_booking("B1", Some(7), 0);
        store.finalize_booking("B1");
        assert!(!store.attach_to_booking(7, Some(5_000), true, 100, 10_000));
    }

    #[test]
    fn test_prune_drops_expired_records() {
        let store = PendingStore::new();
        store.insert_revenue(make_revenue(1, 100, 0));
        store.insert_revenue(make_revenue(2, 200, 8_000));
        store.insert_booking("B1", None, 0);

        store.prune(10_000, 10_000);

        assert!(store.take_revenue_for_index(1, 10_000, 10_000).is_none());
        assert!(store.take_revenue_for_index(2, 10_000, 10_000).is_some());
        assert!(store.attached_payment("B1").is_none());
    }
}
