//! 对账核心
//!
//! 三路事件流在这里合并成对下游的至多一次 create / cancel 转发：
//!
//! ```text
//! raw event ──► engine ──► {identity, payment, pending, cache} 读写
//!                                   │
//!                                   ├── dedup check
//!                                   ├── downstream create/cancel/update
//!                                   └── dedup update
//! ```

pub mod correlator;
pub mod dedup;
pub mod engine;
pub mod identity;
pub mod payment;
pub mod pending;
pub mod snapshot_cache;

pub use engine::ReconEngine;
