//! Deferred Customer Correlator — 客户身份事件的延迟关联
//!
//! 客户身份事件到达时不立即处理：延迟一个固定窗口，等新快照大概率
//! 就绪后再为该客户的预订补发 create。
//!
//! pending 标记保证重入幂等；更长的 cooldown 防止密集身份事件
//! 造成的重处理风暴。引擎持有这里的状态，延迟调度在引擎侧完成。

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

/// 暂存的客户身份更新
#[derive(Debug, Clone)]
pub struct CustomerUpdate {
    pub id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    /// 客户侧最后更新时间（Unix millis）
    pub upd_date: i64,
}

#[derive(Debug, Default)]
pub struct CustomerCorrelator {
    updates: Mutex<HashMap<String, CustomerUpdate>>,
    pending: Mutex<HashSet<String>>,
    cooldown_until: Mutex<HashMap<String, i64>>,
}

impl CustomerCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 暂存更新并标记 pending
    ///
    /// 已在 pending 或 cooldown 内返回 false，调用方不再排程。
    pub fn try_enqueue(&self, update: CustomerUpdate, now: i64) -> bool {
        if self.pending.lock().contains(&update.id) {
            return false;
        }
        if let Some(&until) = self.cooldown_until.lock().get(&update.id)
            && now < until
        {
            return false;
        }
        let id = update.id.clone();
        self.updates.lock().insert(id.clone(), update);
        self.pending.lock().insert(id);
        true
    }

    /// 运行结束：立即清除 pending，同时启动 cooldown
    pub fn finish_run(&self, customer_id: &str, now: i64, cooldown_ms: i64) {
        self.pending.lock().remove(customer_id);
        self.cooldown_until
            .lock()
            .insert(customer_id.to_string(), now + cooldown_ms);
    }

    pub fn get(&self, customer_id: &str) -> Option<CustomerUpdate> {
        self.updates.lock().get(customer_id).cloned()
    }

    /// 快照清扫的匹配判定
    ///
    /// 预订带平台侧更新时间：|Δ| ≤ window 即匹配；
    /// 缺精确时间：客户更新本身足够新（< window）即匹配。
    pub fn matches(
        &self,
        customer_id: Option<&str>,
        booking_upd: Option<i64>,
        now: i64,
        window_ms: i64,
    ) -> bool {
        let Some(cid) = customer_id else {
            return false;
        };
        let Some(update) = self.get(cid) else {
            return false;
        };
        match booking_upd {
            Some(b) => (b - update.upd_date).abs() <= window_ms,
            None => now - update.upd_date < window_ms,
        }
    }
}
