// src/error.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// 存储层错误
///
/// 读路径永远不会返回错误：读失败、数据损坏、已过期对调用方来说都是“不存在”。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 自有模式下无法打开数据目录
    #[error("failed to open store at {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: sled::Error,
    },

    /// 写/删失败，只有 `WriteErrorPolicy::Propagate` 才会返回
    #[error("failed to {op} key '{key}': {source}")]
    Write {
        op: &'static str,
        key: String,
        #[source]
        source: sled::Error,
    },

    #[error("failed to flush store: {0}")]
    Flush(#[source] sled::Error),
}

/// 写失败的处理策略
///
/// 缓存丢一次写只会变成一次未命中，所以默认静默忽略。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WriteErrorPolicy {
    #[default]
    Ignore,
    Log,
    Propagate,
}

impl WriteErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteErrorPolicy::Ignore => "ignore",
            WriteErrorPolicy::Log => "log",
            WriteErrorPolicy::Propagate => "propagate",
        }
    }
}
