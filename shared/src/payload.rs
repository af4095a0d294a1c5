//! 下游连接器载荷

use serde::{Deserialize, Serialize};

/// create / update 调用的规范化载荷
///
/// 时间字段已在 handler 层转换为 UTC Unix millis；
/// 金额是调用时已知的最准确值（对账结果）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingPayload {
    pub book_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub party_size: u32,
    #[serde(default)]
    pub start_at: Option<i64>,
    #[serde(default)]
    pub end_at: Option<i64>,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub hole_count: u32,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub is_paid: bool,
    /// 即时确认预订标记
    #[serde(default)]
    pub immediate: bool,
}
