//! 服务器模块
//!
//! - 配置管理 (config.rs)
//! - HTTP服务器设置 (http.rs)
//!
//! ```rust,ignore
//! use build_info_server::server::ServerBootstrap;
//!
//! let server = ServerBootstrap::new().await?;
//! server.start().await?;
//! ```

pub mod config;
pub mod http;

pub use config::ConfigManager;
pub use http::{HttpServer, ServerManager};

use crate::resolver::{
    spawn_refresh_listener, spawn_signal_listener, spawn_watch, ConfigValueResolver,
    RefreshRequest,
};
use crate::util::config::{Config, RefreshMode};
use crate::{version, AppState};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

const CONFIG_FILE_NAME: &str = "config.yaml";
const REFRESH_CHANNEL_CAPACITY: usize = 16;

/// 服务器引导程序 - 统一的服务器启动入口
pub struct ServerBootstrap {
    config: Config,
    config_path: PathBuf,
    resolver: Arc<ConfigValueResolver>,
    refresh_tx: mpsc::Sender<RefreshRequest>,
    refresh_rx: mpsc::Receiver<RefreshRequest>,
    _log_guard: Option<WorkerGuard>,
}

impl ServerBootstrap {
    /// 加载配置、初始化日志、构建解析器
    pub async fn new() -> Result<Self> {
        let config_path = ConfigManager::find_config_file_path(CONFIG_FILE_NAME);
        let (config, validation_report) = ConfigManager::load_and_validate(&config_path)?;

        let log_guard = ConfigManager::initialize_logging(&config)?;
        ConfigManager::log_validation_report(&validation_report);

        if validation_report.has_errors() {
            return Err(anyhow::anyhow!(
                "配置验证失败: {} 个错误",
                validation_report.error_count()
            ));
        }

        let resolver = Arc::new(ConfigValueResolver::from_config(
            &config.resolution,
            &config_path,
        ));
        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            config_path,
            resolver,
            refresh_tx,
            refresh_rx,
            _log_guard: log_guard,
        })
    }

    /// 外部系统可通过该发送端注入刷新事件
    pub fn refresh_sender(&self) -> mpsc::Sender<RefreshRequest> {
        self.refresh_tx.clone()
    }

    pub fn resolver(&self) -> Arc<ConfigValueResolver> {
        self.resolver.clone()
    }

    /// 启动刷新触发器与HTTP服务
    pub async fn start(self) -> Result<()> {
        info!("=== build-info 服务启动 ===");
        info!(event = "server.version", version = %version::summary());
        info!(
            event = "server.config",
            path = %self.config_path.display(),
            port = self.config.get_port(),
            source_mode = %self.config.resolution.source,
            refresh_mode = %self.config.resolution.refresh
        );

        let listener = spawn_refresh_listener(self.resolver.clone(), self.refresh_rx);
        let signal = spawn_signal_listener(self.refresh_tx.clone());

        let watch_interval = self.config.resolution.watch_interval_secs;
        let watch = if self.config.resolution.refresh == RefreshMode::Live && watch_interval > 0 {
            info!(event = "refresh.watch.enabled", interval_secs = watch_interval);
            Some(spawn_watch(
                self.refresh_tx.clone(),
                Duration::from_secs(watch_interval),
            ))
        } else {
            None
        };

        let app_state = AppState::new(
            self.config.clone(),
            self.resolver.clone(),
            self.refresh_tx.clone(),
        );
        let server = ServerManager::create_server(&self.config, app_state).await?;
        let result = ServerManager::start_server(server).await;

        for handle in [signal, watch].into_iter().flatten() {
            handle.abort();
        }
        drop(self.refresh_tx);
        listener.abort();

        result
    }
}

/// 解析一次并返回格式化结果，供命令行使用；不会写出配置模板
pub fn print_build_info() -> Result<String> {
    let config_path = ConfigManager::find_config_file_path(CONFIG_FILE_NAME);
    resolve_line(&config_path)
}

fn resolve_line(config_path: &Path) -> Result<String> {
    let config = ConfigManager::load_read_only(config_path)?;
    let resolver = ConfigValueResolver::from_config(&config.resolution, config_path);
    Ok(crate::model::format(&resolver.current()))
}
