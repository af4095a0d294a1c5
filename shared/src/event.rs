//! 入站事件 — 捕获层解码后的事件流
//!
//! 抓取/解码机制在本仓库之外，到达这里的已经是字段映射。
//! 所有事件在边界处一次性解码为带标签的枚举，内部不再传递松散 JSON。

use serde::{Deserialize, Serialize};

use crate::booking::BookingRecord;

/// 确认事件 — 表单确认请求的原始字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationEvent {
    pub book_id: String,
    #[serde(default)]
    pub room: Option<String>,
    /// 顶层状态串；非 "success" 的确认事件不可操作
    #[serde(default)]
    pub state: String,
    /// 嵌入的 JSON 文本，格式不受信任（解析失败退化为默认值）
    #[serde(default, rename = "bookingInfo")]
    pub booking_info: Option<String>,
}

/// 确认事件内嵌 blob
///
/// 所有字段可选：缺失或畸形的 blob 都不使事件失败。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingInfoBlob {
    #[serde(default)]
    pub book_idx: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub party_size: Option<u32>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub hole_count: Option<u32>,
}

/// 全量快照事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEvent {
    #[serde(default)]
    pub results: Vec<BookingRecord>,
}

/// 客户身份事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerEvent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub customerinfo_set: Vec<CustomerInfoEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfoEntry {
    /// 客户侧最后更新时间（Unix millis）
    pub upd_date: i64,
}

/// 营收/支付事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueEvent {
    pub book_idx: i64,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub finished: bool,
    /// 营收记录标识（部分接口不回传）
    #[serde(default)]
    pub revenue_id: Option<String>,
}

/// 入站事件信封 — `type` 字段区分流
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum InboundEvent {
    Confirmation(ConfirmationEvent),
    Snapshot(SnapshotEvent),
    Customer(CustomerEvent),
    RevenueCreate(RevenueEvent),
    RevenueUpdate(RevenueEvent),
}

impl InboundEvent {
    /// 流名称（日志用）
    pub fn stream(&self) -> &'static str {
        match self {
            InboundEvent::Confirmation(_) => "confirmation",
            InboundEvent::Snapshot(_) => "snapshot",
            InboundEvent::Customer(_) => "customer",
            InboundEvent::RevenueCreate(_) => "revenue_create",
            InboundEvent::RevenueUpdate(_) => "revenue_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decodes_confirmation() {
        let event: InboundEvent = serde_json::from_str(
            r#"{
                "type": "confirmation",
                "payload": {
                    "book_id": "B1",
                    "room": "5",
                    "state": "success",
                    "bookingInfo": "{\"amount\":10000}"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(event.stream(), "confirmation");
        let InboundEvent::Confirmation(ev) = event else {
            panic!("wrong variant");
        };
        assert_eq!(ev.book_id, "B1");
        assert!(ev.booking_info.is_some());
    }

    #[test]
    fn test_envelope_decodes_revenue_without_optional_fields() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"type": "revenue_update", "payload": {"book_idx": 77, "amount": 5000}}"#,
        )
        .unwrap();
        let InboundEvent::RevenueUpdate(ev) = event else {
            panic!("wrong variant");
        };
        assert_eq!(ev.book_idx, 77);
        assert!(!ev.finished);
        assert!(ev.revenue_id.is_none());
    }

    #[test]
    fn test_customer_event_empty_info_set() {
        let event: InboundEvent =
            serde_json::from_str(r#"{"type": "customer", "payload": {"id": "M1"}}"#).unwrap();
        let InboundEvent::Customer(ev) = event else {
            panic!("wrong variant");
        };
        assert!(ev.customerinfo_set.is_empty());
    }

    #[test]
    fn test_blob_tolerates_partial_fields() {
        let blob: BookingInfoBlob =
            serde_json::from_str(r#"{"amount": 10000, "start_datetime": "2024-01-01T10:00:00+09:00"}"#)
                .unwrap();
        assert_eq!(blob.amount, Some(10000));
        assert!(blob.name.is_none());
    }
}
