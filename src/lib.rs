// src/lib.rs
//! expiring_store 库：engine / entry / store / gc / config

pub mod clock;   // 时钟（墙上时钟 / 手动时钟）
pub mod config;  // JSON 配置
pub mod engine;  // 持久化引擎（sled）
pub mod entry;   // 条目编解码 + 过期判断
pub mod error;   // 错误类型 & 写失败策略
pub mod gc;      // 后台定时清理
pub mod store;   // 带过期时间的命名空间存储

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::Entry;
pub use error::{StoreError, WriteErrorPolicy};
pub use store::{DEFAULT_PREFIX, ExpiringStore, GcStats, Ownership, StoreBuilder};
