//! 时间工具函数 — 事件时间串转换
//!
//! 平台时间串有两种形态：带偏移的 RFC3339 与营业时区的本地时间。
//! 所有转换统一在 handler 层完成，对账核心只持有 UTC Unix millis (`i64`)。

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// 无偏移时间串支持的格式
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// 解析事件时间串为 UTC Unix millis
///
/// 带偏移（"2024-01-01T10:00:00+09:00"）直接换算；
/// 无偏移按营业时区解释。
///
/// DST gap fallback: 如果本地时间不存在（夏令时跳跃），fallback 到 UTC。
pub fn parse_event_datetime(raw: &str, tz: Tz) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(
                naive
                    .and_local_timezone(tz)
                    .latest()
                    .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
                    .unwrap_or_else(|| naive.and_utc().timestamp_millis()),
            );
        }
    }

    None
}

/// 解析营业时区串，失败返回 Asia/Seoul
pub fn parse_timezone(raw: &str) -> Tz {
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(
            "Invalid business timezone '{}', falling back to Asia/Seoul",
            raw
        );
        chrono_tz::Asia::Seoul
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_string_converted_to_utc() {
        // KST 上午 10 点 == UTC 凌晨 1 点
        let millis = parse_event_datetime("2024-01-01T10:00:00+09:00", chrono_tz::Asia::Seoul);
        assert_eq!(millis, Some(1_704_070_800_000));
    }

    #[test]
    fn test_naive_string_uses_business_timezone() {
        let millis = parse_event_datetime("2024-01-01T10:00:00", chrono_tz::Asia::Seoul);
        assert_eq!(millis, Some(1_704_070_800_000));
    }

    #[test]
    fn test_space_separated_format() {
        let millis = parse_event_datetime("2024-01-01 10:00:00", chrono_tz::Asia::Seoul);
        assert_eq!(millis, Some(1_704_070_800_000));
    }

    #[test]
    fn test_garbage_returns_none() {
        assert_eq!(parse_event_datetime("not-a-date", chrono_tz::Asia::Seoul), None);
        assert_eq!(parse_event_datetime("", chrono_tz::Asia::Seoul), None);
    }

    #[test]
    fn test_parse_timezone_fallback() {
        assert_eq!(parse_timezone("Asia/Seoul"), chrono_tz::Asia::Seoul);
        assert_eq!(parse_timezone("Not/AZone"), chrono_tz::Asia::Seoul);
    }
}
