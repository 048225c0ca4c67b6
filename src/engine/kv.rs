// src/engine/kv.rs

use sled::{Db, IVec, Tree};

/// 键迭代器：按前缀惰性产出 key
pub type KeyIter<'a> = Box<dyn Iterator<Item = sled::Result<IVec>> + 'a>;

/// 把 sled::Db 和 sled::Tree 的基本 KV 操作统一化
///
/// 过期存储只依赖这几个点操作 + 前缀扫描，
/// 因此同一个 sled 实例可以被多个命名空间共享。
pub trait KvEngine: Send + Sync {
    fn get(&self, key: &[u8]) -> sled::Result<Option<IVec>>;
    fn insert(&self, key: &[u8], val: &[u8]) -> sled::Result<Option<IVec>>;
    fn remove(&self, key: &[u8]) -> sled::Result<Option<IVec>>;

    /// 原子 CAS 删除：只有当前值仍等于 expected 时才删除，返回是否删除
    fn remove_if_eq(&self, key: &[u8], expected: &[u8]) -> sled::Result<bool>;

    /// 扫描所有以 prefix 开头的 key，每次调用都从头开始
    fn scan_keys(&self, prefix: &[u8]) -> KeyIter<'_>;

    /// 强制落盘
    fn flush(&self) -> sled::Result<()>;
}

// 注意：Db 通过 Deref 拿到 Tree 的方法，这里显式写 Tree::xxx，
// 否则 self.get() 会解析回 trait 方法本身
impl KvEngine for Db {
    fn get(&self, k: &[u8]) -> sled::Result<Option<IVec>> {
        Tree::get(self, k)
    }

    fn insert(&self, k: &[u8], v: &[u8]) -> sled::Result<Option<IVec>> {
        Tree::insert(self, k, v)
    }

    fn remove(&self, k: &[u8]) -> sled::Result<Option<IVec>> {
        Tree::remove(self, k)
    }

    fn remove_if_eq(&self, k: &[u8], expected: &[u8]) -> sled::Result<bool> {
        cas_remove(self, k, expected)
    }

    fn scan_keys(&self, prefix: &[u8]) -> KeyIter<'_> {
        Box::new(Tree::scan_prefix(self, prefix).keys())
    }

    fn flush(&self) -> sled::Result<()> {
        Tree::flush(self).map(|_| ())
    }
}

impl KvEngine for Tree {
    fn get(&self, k: &[u8]) -> sled::Result<Option<IVec>> {
        Tree::get(self, k)
    }

    fn insert(&self, k: &[u8], v: &[u8]) -> sled::Result<Option<IVec>> {
        Tree::insert(self, k, v)
    }

    fn remove(&self, k: &[u8]) -> sled::Result<Option<IVec>> {
        Tree::remove(self, k)
    }

    fn remove_if_eq(&self, k: &[u8], expected: &[u8]) -> sled::Result<bool> {
        cas_remove(self, k, expected)
    }

    fn scan_keys(&self, prefix: &[u8]) -> KeyIter<'_> {
        Box::new(Tree::scan_prefix(self, prefix).keys())
    }

    fn flush(&self) -> sled::Result<()> {
        Tree::flush(self).map(|_| ())
    }
}

fn cas_remove(tree: &Tree, k: &[u8], expected: &[u8]) -> sled::Result<bool> {
    // 外层是 sled 错误，内层是期望值不匹配
    let swapped = tree.compare_and_swap(k, Some(expected), None::<IVec>)?;
    Ok(swapped.is_ok())
}
