// src/main.rs
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use expiring_store::{StoreBuilder, WriteErrorPolicy, config, gc};

/// 带过期时间的持久化缓存
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// JSON 配置文件，不存在时自动生成默认配置
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 覆盖配置中的 db_path
    #[arg(long)]
    db: Option<PathBuf>,

    /// 覆盖配置中的 expire_secs（0 = 永不过期）
    #[arg(long)]
    expire: Option<u64>,

    /// 覆盖配置中的 on_write_error
    #[arg(long, value_enum)]
    on_write_error: Option<WriteErrorPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 写入 <id> -> <payload>
    Set { id: String, payload: String },
    /// 读取 <id>，不存在或已过期时退出码为 1
    Get { id: String },
    /// 删除 <id>
    Del { id: String },
    /// 执行一次 GC
    Gc,
    /// 周期性 GC，直到 Ctrl-C
    Serve,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "expiring_store=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut cfg = config::load(&cli.config)?;
    if let Some(db) = cli.db {
        cfg.db_path = db;
    }
    if let Some(secs) = cli.expire {
        cfg.expire_secs = secs;
    }
    if let Some(policy) = cli.on_write_error {
        cfg.on_write_error = policy;
    }
    info!(
        "db={:?} expire={}s gc_interval={}s on_write_error={}",
        cfg.db_path,
        cfg.expire_secs,
        cfg.gc_interval_secs,
        cfg.on_write_error.as_str()
    );

    // 打不开数据目录就没有降级模式，直接退出
    let store = StoreBuilder::from_config(&cfg)
        .open(&cfg.db_path)
        .context("cannot start without a persistent store")?;

    match cli.command {
        Command::Set { id, payload } => {
            store.set(&id, payload.as_bytes())?;
            println!("OK");
        }
        Command::Get { id } => match store.get(&id) {
            Some(payload) => println!("{}", String::from_utf8_lossy(&payload)),
            None => {
                println!("(nil)");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Del { id } => {
            store.del(&id)?;
            println!("OK");
        }
        Command::Gc => {
            let stats = store.gc_once()?;
            println!("scanned={} removed={}", stats.scanned, stats.removed);
        }
        Command::Serve => {
            let store = Arc::new(store);
            let handle = gc::spawn_gc(store.clone(), Duration::from_secs(cfg.gc_interval_secs));
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            info!("shutting down");
            handle.abort();
            let _ = handle.await;
            store.flush()?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
