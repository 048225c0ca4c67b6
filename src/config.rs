use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use anyhow::{Context, Result, bail};
use tracing::info;

use crate::error::WriteErrorPolicy;
use crate::store::DEFAULT_PREFIX;

/// 进程启动后，从 config.json 中读到的全局配置
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// sled 数据目录
    pub db_path: PathBuf,
    /// 过期时长（秒），0 表示永不过期
    pub expire_secs: u64,
    /// 后台 GC 周期（秒）
    pub gc_interval_secs: u64,
    /// 命名空间前缀
    pub key_prefix: String,
    /// 写失败处理策略
    pub on_write_error: WriteErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("captcha.db"),
            expire_secs: 600,
            gc_interval_secs: 60,
            key_prefix: DEFAULT_PREFIX.to_string(),
            on_write_error: WriteErrorPolicy::Ignore,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.gc_interval_secs == 0 {
            bail!("gc_interval_secs must be greater than 0");
        }
        if self.key_prefix.is_empty() {
            bail!("key_prefix must not be empty");
        }
        Ok(())
    }
}

/// 从指定路径读取并反序列化 JSON 配置
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();

    // 如果配置文件不存在，创建默认配置
    if !path_ref.exists() {
        info!("config file not found, creating default configuration");

        let default_cfg = Config::default();
        let default_json = serde_json::to_string_pretty(&default_cfg)?;
        fs::write(path_ref, default_json)
            .with_context(|| format!("Failed to write default config {:?}", path_ref))?;
        info!("default config created at {:?}", path_ref);

        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;
    let cfg: Config = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse {:?}", path_ref))?;
    cfg.validate()?;
    Ok(cfg)
}
