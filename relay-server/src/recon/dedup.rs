//! Dedup Tracker — 已转发预订号集合
//!
//! create 与 cancel 各一个集合，进程生命周期内有效。
//! 集合到达阈值时整体清空（周期清理策略）：下游接收方本身幂等，
//! 清空后的重复转发是可接受的。

use std::collections::HashSet;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardKind {
    Create,
    Cancel,
}

#[derive(Debug)]
pub struct ForwardTracker {
    created: Mutex<HashSet<String>>,
    canceled: Mutex<HashSet<String>>,
    clear_threshold: usize,
}

impl ForwardTracker {
    pub fn new(clear_threshold: usize) -> Self {
        Self {
            created: Mutex::new(HashSet::new()),
            canceled: Mutex::new(HashSet::new()),
            clear_threshold,
        }
    }

    /// 任一集合包含即视为已处理
    pub fn seen(&self, book_id: &str) -> bool {
        self.created.lock().contains(book_id) || self.canceled.lock().contains(book_id)
    }

    pub fn seen_create(&self, book_id: &str) -> bool {
        self.created.lock().contains(book_id)
    }

    pub fn seen_cancel(&self, book_id: &str) -> bool {
        self.canceled.lock().contains(book_id)
    }

    /// 记录一次转发；集合到达阈值先整体清空再插入
    pub fn record(&self, kind: ForwardKind, book_id: &str) {
        let mut set = match kind {
            ForwardKind::Create => self.created.lock(),
            ForwardKind::Cancel => self.canceled.lock(),
        };
        if set.len() >= self.clear_threshold {
            tracing::info!(
                kind = ?kind,
                size = set.len(),
                "Forward set reached threshold, clearing"
            );
            set.clear();
        }
        set.insert(book_id.to_string());
    }
}
