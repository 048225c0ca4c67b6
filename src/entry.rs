// src/entry.rs

//! 条目编解码
//!
//! 落盘格式是一个 JSON 对象：
//! - `d`：负载，十六进制字符串
//! - `c`：创建时间（UNIX 秒）
//!
//! 解码永远不会失败：空字节或损坏的数据都解码成零值条目，
//! 上层把零值条目与“已过期”同样对待。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::clock::Clock;

/// 一条缓存数据：负载 + 创建时间
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "d", with = "hex_bytes")]
    pub payload: Vec<u8>,
    #[serde(rename = "c")]
    pub created_at: i64,
}

impl Entry {
    /// 新条目，创建时间取自 `clock`；负载不做任何校验
    pub fn new(payload: impl Into<Vec<u8>>, clock: &dyn Clock) -> Self {
        Self::with_timestamp(payload, clock.now_secs())
    }

    /// 指定创建时间
    pub fn with_timestamp(payload: impl Into<Vec<u8>>, created_at: i64) -> Self {
        Entry {
            payload: payload.into(),
            created_at,
        }
    }

    /// 从落盘字节解析；解析失败返回零值条目
    pub fn decode(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Entry::default();
        }
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    pub fn encode(&self) -> Vec<u8> {
        // 只有 Vec<u8> 和 i64 两个字段，序列化不会失败
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// 缺失或损坏的数据
    pub fn is_zero(&self) -> bool {
        self.created_at <= 0
    }

    /// 过期判断
    ///
    /// * `ttl == 0` 表示永不过期
    /// * 否则当 `now >= created_at + ttl` 时过期；不足一秒的 ttl 向上取整
    /// * 零值条目在任何非零 ttl 下都视为过期
    pub fn is_expired(&self, ttl: Duration, now: i64) -> bool {
        if ttl.is_zero() {
            return false;
        }
        if self.is_zero() {
            return true;
        }
        now >= self.created_at.saturating_add(ttl_secs(ttl))
    }
}

/// ttl 换算成整秒（向上取整）
fn ttl_secs(ttl: Duration) -> i64 {
    let mut secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs = secs.saturating_add(1);
    }
    i64::try_from(secs).unwrap_or(i64::MAX)
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(D::Error::custom)
    }
}
