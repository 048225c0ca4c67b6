// src/gc.rs

//! 后台定时清理任务
//!
//! 存储本身只提供一次性的 `gc_once`，这里用 tokio 的 interval 周期性地调用它。
//! 取消方式是 abort 返回的 JoinHandle（或 drop `run_gc` 的 future）；
//! 已经开始的 sled 调用不会被打断，最多等当前这一轮扫完。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::engine::KvEngine;
use crate::store::ExpiringStore;

/// 启动后台清理任务
pub fn spawn_gc<E>(store: Arc<ExpiringStore<E>>, every: Duration) -> JoinHandle<()>
where
    E: KvEngine + 'static,
{
    tokio::spawn(run_gc(store, every))
}

/// 清理循环，每个 tick 扫一次命名空间
pub async fn run_gc<E>(store: Arc<ExpiringStore<E>>, every: Duration)
where
    E: KvEngine + 'static,
{
    // interval 不接受 0
    if every.is_zero() {
        warn!("gc interval is zero, cleaner not started");
        return;
    }

    let mut iv = interval(every);
    // 某一轮扫得太久时不要连续补跑
    iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("gc cleaner started, interval {:?}", every);

    loop {
        iv.tick().await;
        // 统计日志由 gc_once 自己打
        if let Err(e) = store.gc_once() {
            warn!(error = %e, "gc tick failed");
        }
    }
}
