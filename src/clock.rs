// src/clock.rs

//! 时钟：条目创建与过期判断必须使用同一个时钟、同样的秒级精度

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 返回 UNIX 秒
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> i64;
}

/// 墙上时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        // 系统时间早于 1970 时按 0 处理
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(whole_secs)
            .unwrap_or(0)
    }
}

/// 超出 i64 的部分饱和到 i64::MAX
fn whole_secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

/// 手动拨动的时钟，测试和需要确定性过期的调用方使用
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        ManualClock { now: AtomicI64::new(now) }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
