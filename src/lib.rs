use std::sync::Arc;

pub mod api;
pub mod db;
pub mod model;
pub mod resolver;
pub mod server;
pub mod util;
pub mod version;

use resolver::{ConfigValueResolver, RefreshRequest};
use tokio::sync::mpsc;
use util::config::Config;

/// 应用状态结构
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: Arc<ConfigValueResolver>,
    /// 刷新请求统一经由监听任务处理
    pub refresh_tx: mpsc::Sender<RefreshRequest>,
}

impl AppState {
    pub fn new(
        config: Config,
        resolver: Arc<ConfigValueResolver>,
        refresh_tx: mpsc::Sender<RefreshRequest>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
            refresh_tx,
        }
    }
}
