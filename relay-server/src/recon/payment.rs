//! Payment Ledger — 每个预订的最新已知金额与支付标记
//!
//! 权威序：快照 > 营收事件 > 表单推测值。
//! `paid` 是显式支付信号的逻辑或；只有权威快照可以把它回退，
//! 回退视为来源冲突，记 warn 不崩溃。
//!
//! 每次变更都是单次原子替换，不跨挂起点做 read-modify-write。

use std::collections::HashMap;

use parking_lot::RwLock;

/// 最后写入账本的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSource {
    /// 表单 blob 推测值（快照确认前）
    Speculative,
    /// 营收事件
    Revenue,
    /// 平台全量快照（权威）
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentEntry {
    pub amount: Option<i64>,
    pub paid: bool,
    pub source: PaymentSource,
}

#[derive(Debug, Default)]
pub struct PaymentLedger {
    entries: RwLock<HashMap<String, PaymentEntry>>,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推测值首写规则：已有任何记录时不覆盖
    ///
    /// 返回是否落地。
    pub fn seed_speculative(&self, book_id: &str, amount: i64) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(book_id) {
            return false;
        }
        entries.insert(
            book_id.to_string(),
            PaymentEntry {
                amount: Some(amount),
                paid: false,
                source: PaymentSource::Speculative,
            },
        );
        true
    }

    /// 营收事件更新：覆盖金额；`paid` 只升不降
    pub fn apply_revenue(&self, book_id: &str, amount: Option<i64>, finished: bool) {
        let mut entries = self.entries.write();
        let entry = entries.entry(book_id.to_string()).or_insert(PaymentEntry {
            amount: None,
            paid: false,
            source: PaymentSource::Revenue,
        });
        if amount.is_some() {
            entry.amount = amount;
        }
        entry.paid = entry.paid || finished;
        entry.source = PaymentSource::Revenue;
    }

    /// 快照权威覆盖：金额与支付标记双覆盖
    ///
    /// `paid` true→false 的回退是显式来源冲突，记 warn。
    pub fn apply_snapshot(&self, book_id: &str, amount: Option<i64>, paid: bool) {
        let mut entries = self.entries.write();
        let entry = entries.entry(book_id.to_string()).or_insert(PaymentEntry {
            amount: None,
            paid: false,
            source: PaymentSource::Snapshot,
        });
        if entry.paid && !paid {
            tracing::warn!(book_id, "Snapshot reverts paid flag, source conflict");
        }
        if amount.is_some() {
            entry.amount = amount;
        }
        entry.paid = paid;
        entry.source = PaymentSource::Snapshot;
    }

    pub fn get(&self, book_id: &str) -> Option<PaymentEntry> {
        self.entries.read().get(book_id).copied()
    }

    /// 组装载荷时的最终值：账本值优先，缺省回退调用方给定值
    pub fn resolve(
        &self,
        book_id: &str,
        fallback_amount: Option<i64>,
        fallback_paid: bool,
    ) -> (i64, bool) {
        match self.get(book_id) {
            Some(entry) => (entry.amount.or(fallback_amount).unwrap_or(0), entry.paid),
            None => (fallback_amount.unwrap_or(0), fallback_paid),
        }
    }
}
