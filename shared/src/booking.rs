//! 预订领域模型
//!
//! 三路事件流（确认、快照、营收）描述的都是同一个预订实体，
//! 这里定义它们共享的状态枚举与快照行记录。

use serde::{Deserialize, Serialize};

/// 预订状态（平台侧 `state` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    #[default]
    Pending,
    Success,
    Canceling,
    Canceled,
    /// 平台新增的未知状态值，解码不失败
    #[serde(other)]
    Unknown,
}

impl BookingState {
    /// canceling / canceled 都走取消流
    pub fn is_cancelish(self) -> bool {
        matches!(self, BookingState::Canceling | BookingState::Canceled)
    }
}

/// 预订来源渠道（平台侧 `book_type` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingOrigin {
    /// 移动端 App 渠道（快照清扫中需要补建的渠道）
    App,
    /// 网页渠道
    Web,
    #[default]
    #[serde(other)]
    Other,
}

/// 平台全量列表中的一行预订记录
///
/// 字段均为宽松可选：平台在不同接口版本间会缺字段，
/// 单行缺字段不应使整个快照解码失败。
/// 时间串保持原样，转换统一在 handler 层完成。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BookingRecord {
    pub book_id: String,
    /// 平台内部序号，可能在创建后才可知
    #[serde(default)]
    pub book_idx: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub party_size: Option<u32>,
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub state: BookingState,
    #[serde(default)]
    pub book_type: BookingOrigin,
    /// 即时确认预订（无需客户动作匹配即可补建）
    #[serde(default)]
    pub is_immediate: bool,
    /// 金额按平台原样的整数单位保存
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub is_paid: bool,
    /// 客户标识（客户身份流的关联键）
    #[serde(default)]
    pub member_id: Option<String>,
    /// 平台侧最后更新时间（Unix millis）
    #[serde(default)]
    pub upd_date: Option<i64>,
    #[serde(default)]
    pub hole_count: Option<u32>,
}
