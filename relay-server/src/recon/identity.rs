//! Identity Ledger — 营收标识 / 平台序号 ↔ 预订号映射
//!
//! 平台会重新分配序号，后写覆盖先写（last-write-wins）是有意行为。
//! 一个预订一生中可以对应多个营收标识（多对一）。

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct IdentityLedger {
    by_revenue: DashMap<String, String>,
    by_index: DashMap<i64, String>,
}

impl IdentityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_index(&self, idx: i64, book_id: &str) {
        self.by_index.insert(idx, book_id.to_string());
    }

    pub fn resolve_by_index(&self, idx: i64) -> Option<String> {
        self.by_index.get(&idx).map(|v| v.clone())
    }

    pub fn link_revenue(&self, revenue_id: &str, book_id: &str) {
        self.by_revenue.insert(revenue_id.to_string(), book_id.to_string());
    }

    pub fn resolve_by_revenue(&self, revenue_id: &str) -> Option<String> {
        self.by_revenue.get(revenue_id).map(|v| v.clone())
    }

    /// 营收标识优先，回退平台序号
    pub fn resolve(&self, revenue_id: Option<&str>, idx: Option<i64>) -> Option<String> {
        if let Some(rid) = revenue_id
            && let Some(book_id) = self.resolve_by_revenue(rid)
        {
            return Some(book_id);
        }
        idx.and_then(|i| self.resolve_by_index(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_lookup_takes_precedence() {
        let ledger = IdentityLedger::new();
        ledger.link_index(7, "B-IDX");
        ledger.link_revenue("R1", "B-REV");

        assert_eq!(ledger.resolve(Some("R1"), Some(7)), Some("B-REV".into()));
        assert_eq!(ledger.resolve(None, Some(7)), Some("B-IDX".into()));
        assert_eq!(ledger.resolve(Some("R2"), Some(7)), Some("B-IDX".into()));
        assert_eq!(ledger.resolve(Some("R2"), None), None);
    }

    #[test]
    fn test_later_link_overwrites() {
        // 平台重新分配序号：后写覆盖
        let ledger = IdentityLedger::new();
        ledger.link_index(7, "B1");
        ledger.link_index(7, "B2");
        assert_eq!(ledger.resolve_by_index(7), Some("B2".into()));
    }

    #[test]
    fn test_many_revenue_ids_per_booking() {
        let ledger = IdentityLedger::new();
        ledger.link_revenue("R1", "B1");
        ledger.link_revenue("R2", "B1");
        assert_eq!(ledger.resolve_by_revenue("R1"), Some("B1".into()));
        assert_eq!(ledger.resolve_by_revenue("R2"), Some("B1".into()));
    }
}
