//! 延迟客户关联场景
//!
//! 客户身份事件 → 10s 延迟 → 以缓存快照为该客户补发 create。
//! ManualClock 驱动延迟与冷却窗口。

mod common;

use common::{T0, make_harness, make_record};
use relay_server::utils::Clock;
use shared::booking::BookingState;
use shared::event::{CustomerEvent, CustomerInfoEntry, SnapshotEvent};

fn make_customer(id: &str, upd_date: i64) -> CustomerEvent {
    CustomerEvent {
        id: id.to_string(),
        name: Some("Kim".to_string()),
        phone: Some("010-0000-0000".to_string()),
        customerinfo_set: vec![CustomerInfoEntry { upd_date }],
    }
}

fn make_member_booking(book_id: &str, member_id: &str, upd_date: i64) -> shared::booking::BookingRecord {
    let mut rec = make_record(book_id);
    rec.member_id = Some(member_id.to_string());
    rec.state = BookingState::Success;
    rec.upd_date = Some(upd_date);
    rec
}

#[tokio::test]
async fn test_correlation_forwards_after_delay_sorted_by_upd_date() {
    let h = make_harness();

    // 新快照就绪
    h.engine
        .handle_snapshot(SnapshotEvent {
            results: vec![
                make_member_booking("B1", "M1", T0 - 5_000),
                make_member_booking("B2", "M1", T0 - 1_000),
                make_member_booking("B3", "M2", T0 - 1_000),
            ],
        })
        .await
        .unwrap();

    h.engine
        .clone()
        .handle_customer(make_customer("M1", T0 - 1_000))
        .await
        .unwrap();
    h.settle().await;

    // 延迟窗口未到：不转发
    assert_eq!(*h.downstream.create_attempts.lock(), 0);

    h.clock.advance(10_000);
    h.settle().await;

    let creates = h.downstream.creates.lock();
    // 只转发 M1 的预订，按更新时间降序
    assert_eq!(creates.len(), 2);
    assert_eq!(creates[0].book_id, "B2");
    assert_eq!(creates[1].book_id, "B1");
}

#[tokio::test]
async fn test_correlation_skipped_without_fresh_snapshot() {
    let h = make_harness();

    h.engine
        .clone()
        .handle_customer(make_customer("M1", T0 - 1_000))
        .await
        .unwrap();
    h.settle().await;
    h.clock.advance(10_000);
    h.settle().await;

    assert_eq!(*h.downstream.create_attempts.lock(), 0);
}

#[tokio::test]
async fn test_stale_customer_update_discarded() {
    let h = make_harness();
    h.engine
        .handle_snapshot(SnapshotEvent {
            results: vec![make_member_booking("B1", "M1", T0)],
        })
        .await
        .unwrap();

    // 超过 30s 的身份更新不可操作
    h.engine
        .clone()
        .handle_customer(make_customer("M1", T0 - 30_001))
        .await
        .unwrap();
    h.settle().await;
    h.clock.advance(10_000);
    h.settle().await;

    assert_eq!(*h.downstream.create_attempts.lock(), 0);
}

#[tokio::test]
async fn test_pending_guard_and_cooldown() {
    let h = make_harness();
    h.engine
        .handle_snapshot(SnapshotEvent {
            results: vec![make_member_booking("B1", "M1", T0)],
        })
        .await
        .unwrap();

    h.engine
        .clone()
        .handle_customer(make_customer("M1", T0))
        .await
        .unwrap();
    // pending 中的重复事件是 no-op，不会排出第二个任务
    h.engine
        .clone()
        .handle_customer(make_customer("M1", T0))
        .await
        .unwrap();
    h.settle().await;

    h.clock.advance(10_000);
    h.settle().await;
    assert_eq!(*h.downstream.create_attempts.lock(), 1);

    // cooldown 内的新身份事件同样被忽略
    h.engine
        .clone()
        .handle_customer(make_customer("M1", h.clock.now_millis()))
        .await
        .unwrap();
    h.settle().await;
    h.clock.advance(10_000);
    h.settle().await;
    assert_eq!(*h.downstream.create_attempts.lock(), 1);
}

#[tokio::test]
async fn test_correlation_skips_deduplicated_bookings() {
    let h = make_harness();
    let mut already = make_member_booking("B1", "M1", T0);
    already.book_type = shared::booking::BookingOrigin::App;
    already.is_immediate = true;

    // 快照清扫已转发 B1
    h.engine
        .handle_snapshot(SnapshotEvent {
            results: vec![already, make_member_booking("B2", "M1", T0 - 2_000)],
        })
        .await
        .unwrap();
    assert_eq!(h.downstream.creates.lock().len(), 1);

    h.engine
        .clone()
        .handle_customer(make_customer("M1", T0))
        .await
        .unwrap();
    h.settle().await;
    h.clock.advance(10_000);
    h.settle().await;

    let creates = h.downstream.creates.lock();
    assert_eq!(creates.len(), 2);
    assert_eq!(creates[1].book_id, "B2");
}

// ============================================================================
// Snapshot sweep customer matching (§ window property)
// ============================================================================

#[tokio::test]
async fn test_customer_match_window_within_59s() {
    let h = make_harness();

    // 暂存客户更新（不推进时钟，延迟任务不会触发）
    let customer_upd = T0 - 1_000;
    h.engine
        .clone()
        .handle_customer(make_customer("M1", customer_upd))
        .await
        .unwrap();

    let mut rec = make_member_booking("B1", "M1", customer_upd + 59_000);
    rec.book_type = shared::booking::BookingOrigin::App;

    h.engine
        .handle_snapshot(SnapshotEvent { results: vec![rec] })
        .await
        .unwrap();

    // 59s 差值命中窗口 → create
    assert_eq!(h.downstream.creates.lock().len(), 1);
}

#[tokio::test]
async fn test_customer_match_window_beyond_61s() {
    let h = make_harness();

    let customer_upd = T0 - 1_000;
    h.engine
        .clone()
        .handle_customer(make_customer("M1", customer_upd))
        .await
        .unwrap();

    let mut rec = make_member_booking("B1", "M1", customer_upd + 61_000);
    rec.book_type = shared::booking::BookingOrigin::App;

    h.engine
        .handle_snapshot(SnapshotEvent { results: vec![rec] })
        .await
        .unwrap();

    // 61s 差值不命中 → 留待后续快照
    assert_eq!(h.downstream.creates.lock().len(), 0);
}

#[tokio::test]
async fn test_matched_cancelish_app_booking_cancels() {
    let h = make_harness();

    h.engine
        .clone()
        .handle_customer(make_customer("M1", T0 - 1_000))
        .await
        .unwrap();

    // 第一个快照里 B1 尚是 pending → 不动作
    let mut rec = make_member_booking("B1", "M1", T0 - 1_000);
    rec.book_type = shared::booking::BookingOrigin::App;
    rec.state = BookingState::Pending;
    h.engine
        .handle_snapshot(SnapshotEvent {
            results: vec![rec.clone()],
        })
        .await
        .unwrap();
    assert_eq!(*h.downstream.cancel_attempts.lock(), 0);

    // 客户在 App 内取消后：matched + canceling → cancel
    rec.state = BookingState::Canceling;
    h.engine
        .handle_snapshot(SnapshotEvent { results: vec![rec] })
        .await
        .unwrap();
    assert_eq!(h.downstream.cancels.lock().len(), 1);
}
