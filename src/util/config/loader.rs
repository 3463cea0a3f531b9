//! 配置加载和管理模块
//! 处理配置文件的读取、写入和环境变量覆盖

use super::types::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "BUILD_INFO_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从YAML文件读取配置
    pub fn read_yaml(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = serde_yaml::from_str(&config_str)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 从进程环境变量读取配置覆盖
    pub fn apply_env_overrides(config: Config) -> Config {
        Self::apply_overrides_from(config, |name| std::env::var(name).ok())
    }

    /// 使用给定的查找函数应用覆盖，便于测试注入
    pub fn apply_overrides_from<F>(mut config: Config, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(host) = var("HOST") {
            config.server.host = host.clone();
            tracing::info!(event = "config.env_override", key = "server.host", value = %host);
        }

        if let Some(port_str) = var("PORT") {
            match port_str.trim().parse::<u16>() {
                Ok(port) => {
                    config.server.port = port;
                    tracing::info!(event = "config.env_override", key = "server.port", value = port);
                }
                Err(_) => {
                    tracing::warn!("[warn] {ENV_PREFIX}PORT 无法解析为端口号: {}", port_str);
                }
            }
        }

        if let Some(level) = var("LOG_LEVEL") {
            config.logging.level = level.clone();
            tracing::info!(event = "config.env_override", key = "logging.level", value = %level);
        }

        if let Some(mode) = var("SOURCE_MODE") {
            match mode.parse::<SourceMode>() {
                Ok(parsed) => {
                    config.resolution.source = parsed;
                    tracing::info!(event = "config.env_override", key = "resolution.source", value = %parsed);
                }
                Err(e) => tracing::warn!("[warn] {ENV_PREFIX}SOURCE_MODE 无效: {}", e),
            }
        }

        if let Some(mode) = var("REFRESH_MODE") {
            match mode.parse::<RefreshMode>() {
                Ok(parsed) => {
                    config.resolution.refresh = parsed;
                    tracing::info!(event = "config.env_override", key = "resolution.refresh", value = %parsed);
                }
                Err(e) => tracing::warn!("[warn] {ENV_PREFIX}REFRESH_MODE 无效: {}", e),
            }
        }

        if let Some(interval) = var("WATCH_INTERVAL") {
            match interval.trim().parse::<u64>() {
                Ok(secs) => {
                    config.resolution.watch_interval_secs = secs;
                    tracing::info!(
                        event = "config.env_override",
                        key = "resolution.watch_interval_secs",
                        value = secs
                    );
                }
                Err(_) => {
                    tracing::warn!("[warn] {ENV_PREFIX}WATCH_INTERVAL 无法解析: {}", interval);
                }
            }
        }

        config
    }

    /// 读取文件并应用环境变量覆盖
    pub fn load_with_env_overrides(path: impl AsRef<Path>) -> Result<Config> {
        let base_config = Self::read_yaml(path)?;
        let config = Self::apply_env_overrides(base_config);
        tracing::debug!(event = "config.load.complete");
        Ok(config)
    }
}

/// 配置写入器
pub struct ConfigWriter;

impl ConfigWriter {
    /// 写入YAML，必要时创建上级目录
    pub fn write_yaml_with_dir(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let yaml_content = serde_yaml::to_string(config)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    /// 生成配置模板
    pub fn generate_template() -> Config {
        Config::default()
    }
}
