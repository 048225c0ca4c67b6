// src/engine/mod.rs

//! # 引擎模块
//!
//! 持久化引擎是外部协作者：过期存储本身不关心落盘、压缩与文件布局，
//! 只通过 [`KvEngine`] 使用点读写、删除和前缀扫描。
//! - `sled::Db`：默认 tree，最常见的用法
//! - `sled::Tree`：同一个 sled 实例中的独立命名 tree
pub mod kv;
pub use kv::{KeyIter, KvEngine};

use std::path::Path;

/// 打开（或创建）一个 sled 数据库
pub fn open<P: AsRef<Path>>(path: P) -> sled::Result<sled::Db> {
    sled::open(path)
}
