// src/store.rs

//! 带过期时间的 KV 存储
//!
//! 所有数据都写在 `<prefix><id>` 下，prefix 在实例生命周期内固定，
//! 并且同一个引擎里不会被其他数据使用，GC 因此可以只扫描这个前缀。
//!
//! 过期有两条路径，共用同一个判断 [`ExpiringStore::is_stale`]：
//! - 惰性：`get` 读到过期条目时顺手删除
//! - 清扫：`gc_once` 扫描整个命名空间，删除过期和损坏的条目

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sled::Db;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::engine::{self, KvEngine};
use crate::entry::Entry;
use crate::error::{StoreError, WriteErrorPolicy};

/// 默认命名空间前缀
pub const DEFAULT_PREFIX: &str = "__captcha";

/// 引擎句柄的归属
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// 存储自己打开的引擎，drop 时负责落盘
    Owned,
    /// 调用方注入的引擎，存储永远不会关闭或 flush 它
    Shared,
}

/// 一次 GC 的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub scanned: usize,
    pub removed: usize,
    /// 删除失败的 key 数
    pub failed: usize,
}

/// 构造器：ttl / 前缀 / 写失败策略 / 时钟
#[derive(Clone)]
pub struct StoreBuilder {
    ttl: Duration,
    prefix: String,
    on_write_error: WriteErrorPolicy,
    clock: Arc<dyn Clock>,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        StoreBuilder {
            ttl: Duration::ZERO,
            prefix: DEFAULT_PREFIX.to_string(),
            on_write_error: WriteErrorPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new()
            .ttl(Duration::from_secs(cfg.expire_secs))
            .prefix(cfg.key_prefix.clone())
            .on_write_error(cfg.on_write_error)
    }

    /// 过期时长，0 表示永不过期
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn on_write_error(mut self, policy: WriteErrorPolicy) -> Self {
        self.on_write_error = policy;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 自有模式：打开（或创建）`path` 下的数据库
    ///
    /// 打不开时返回 [`StoreError::Open`]，是否终止进程由调用方决定。
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<ExpiringStore<Db>, StoreError> {
        let path = path.as_ref();
        let db = engine::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "opened owned store");
        Ok(self.build(db, Ownership::Owned))
    }

    /// 共享模式：使用调用方已经打开的引擎，不会失败
    pub fn with_engine<E: KvEngine>(self, engine: E) -> ExpiringStore<E> {
        self.build(engine, Ownership::Shared)
    }

    fn build<E: KvEngine>(self, engine: E, ownership: Ownership) -> ExpiringStore<E> {
        // 空前缀会让 GC 扫到整个引擎
        let prefix = if self.prefix.is_empty() {
            warn!("empty key prefix, falling back to {:?}", DEFAULT_PREFIX);
            DEFAULT_PREFIX.to_string()
        } else {
            self.prefix
        };
        ExpiringStore {
            engine,
            ownership,
            prefix: prefix.into_bytes(),
            ttl: self.ttl,
            on_write_error: self.on_write_error,
            clock: self.clock,
        }
    }
}

/// 带过期时间的命名空间存储
///
/// 除了引擎句柄和配置外不持有任何状态，不加锁；
/// 并发安全性完全取决于底层引擎（sled 支持并发点操作和迭代）。
pub struct ExpiringStore<E: KvEngine = Db> {
    engine: E,
    ownership: Ownership,
    prefix: Vec<u8>,
    ttl: Duration,
    on_write_error: WriteErrorPolicy,
    clock: Arc<dyn Clock>,
}

impl ExpiringStore<Db> {
    /// 自有模式的快捷入口
    pub fn open<P: AsRef<Path>>(path: P, ttl: Duration) -> Result<Self, StoreError> {
        StoreBuilder::new().ttl(ttl).open(path)
    }
}

impl<E: KvEngine> ExpiringStore<E> {
    /// 共享模式的快捷入口
    pub fn with_engine(engine: E, ttl: Duration) -> Self {
        StoreBuilder::new().ttl(ttl).with_engine(engine)
    }

    /// `prefix || id`
    pub fn namespaced_key(&self, id: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.prefix.len() + id.len());
        key.extend_from_slice(&self.prefix);
        key.extend_from_slice(id.as_bytes());
        key
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// 写入新条目，无条件覆盖旧值（创建时间随之刷新）
    pub fn set(&self, id: &str, payload: &[u8]) -> Result<(), StoreError> {
        let entry = Entry::new(payload, self.clock.as_ref());
        match self.engine.insert(&self.namespaced_key(id), &entry.encode()) {
            Ok(_) => Ok(()),
            Err(e) => self.write_failed("set", id, e),
        }
    }

    /// 读取负载；不存在、损坏、已过期都返回 None
    ///
    /// 过期或损坏的条目会被顺手删除。
    pub fn get(&self, id: &str) -> Option<Vec<u8>> {
        let key = self.namespaced_key(id);
        let raw = match self.engine.get(&key) {
            Ok(Some(raw)) => Some(raw),
            Ok(None) => return None,
            Err(e) => {
                debug!(id, error = %e, "read failed, treating as absent");
                None
            }
        };
        let entry = Entry::decode(raw.as_deref().unwrap_or_default());

        if self.is_stale(&entry) {
            debug!(id, created_at = entry.created_at, "lazy expire");
            if let Err(e) = self.remove_stale(&key, raw.as_deref()) {
                // get 不向调用方报告写错误，Log 策略下仍会记日志
                let _ = self.write_failed("del", id, e);
            }
            return None;
        }
        Some(entry.payload)
    }

    /// 删除；key 不存在也视为成功
    pub fn del(&self, id: &str) -> Result<(), StoreError> {
        match self.engine.remove(&self.namespaced_key(id)) {
            Ok(_) => Ok(()),
            Err(e) => self.write_failed("del", id, e),
        }
    }

    /// 扫描一次整个命名空间，删除过期或损坏的条目
    ///
    /// 不保证原子性：扫描期间新写入的 key 可能被看到也可能看不到；
    /// 被并发删除的 key 会读到空，直接跳过；被并发改写的 key 不会被删。
    /// 与自身并发运行也是安全的。
    ///
    /// 某个 key 删除失败不会中断扫描；`Propagate` 策略下扫完后返回第一个错误。
    pub fn gc_once(&self) -> Result<GcStats, StoreError> {
        let mut stats = GcStats::default();
        let mut first_err = None;

        for item in self.engine.scan_keys(&self.prefix) {
            let key = match item {
                Ok(k) => k,
                Err(e) => {
                    warn!(error = %e, "gc scan aborted");
                    break;
                }
            };
            stats.scanned += 1;

            // 重新读一次，扫描和读取之间可能被并发修改
            let raw = match self.engine.get(&key) {
                Ok(None) => continue,
                Ok(Some(raw)) => Some(raw),
                Err(e) => {
                    debug!(error = %e, "gc read failed, treating as empty");
                    None
                }
            };
            if !self.is_stale(&Entry::decode(raw.as_deref().unwrap_or_default())) {
                continue;
            }

            let id = String::from_utf8_lossy(&key[self.prefix.len()..]).into_owned();
            match self.remove_stale(&key, raw.as_deref()) {
                Ok(true) => stats.removed += 1,
                Ok(false) => debug!(id = %id, "rewritten during gc, kept"),
                Err(e) => {
                    stats.failed += 1;
                    if let Err(err) = self.write_failed("del", &id, e) {
                        first_err.get_or_insert(err);
                    }
                }
            }
        }

        if stats.removed > 0 || stats.failed > 0 {
            info!(scanned = stats.scanned, removed = stats.removed, failed = stats.failed, "gc sweep");
        } else {
            debug!(scanned = stats.scanned, "gc sweep, nothing to remove");
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }

    /// 强制落盘
    pub fn flush(&self) -> Result<(), StoreError> {
        self.engine.flush().map_err(StoreError::Flush)
    }

    /// 读路径和 GC 共用的判断：缺失/损坏，或已过期
    pub fn is_stale(&self, entry: &Entry) -> bool {
        entry.is_zero() || entry.is_expired(self.ttl, self.clock.now_secs())
    }

    /// 删除判定为过期的 key，返回是否真的删掉了
    ///
    /// `seen` 是判定时读到的值，只有当前值仍与它相同时才删除，
    /// 避免删掉判定之后并发写入的新条目。读失败时没有可比对的值，直接删除。
    fn remove_stale(&self, key: &[u8], seen: Option<&[u8]>) -> sled::Result<bool> {
        match seen {
            Some(raw) => self.engine.remove_if_eq(key, raw),
            None => self.engine.remove(key).map(|prev| prev.is_some()),
        }
    }

    fn write_failed(&self, op: &'static str, id: &str, source: sled::Error) -> Result<(), StoreError> {
        match self.on_write_error {
            WriteErrorPolicy::Ignore => Ok(()),
            WriteErrorPolicy::Log => {
                warn!(op, id, error = %source, "write failed");
                Ok(())
            }
            WriteErrorPolicy::Propagate => Err(StoreError::Write {
                op,
                key: id.to_string(),
                source,
            }),
        }
    }
}

impl<E: KvEngine> Drop for ExpiringStore<E> {
    fn drop(&mut self) {
        // 共享引擎由调用方负责
        if self.ownership == Ownership::Owned {
            if let Err(e) = self.engine.flush() {
                warn!(error = %e, "flush on close failed");
            }
        }
    }
}
