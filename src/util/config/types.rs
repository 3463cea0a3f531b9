//! 配置数据结构定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// 主配置结构
///
/// `build:` 等业务键不在这里建模，由 [`crate::resolver::YamlFileSource`]
/// 以扁平键的形式读取同一个文件。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

impl Config {
    pub fn get_port(&self) -> u16 {
        self.server.port
    }

    pub fn bind_host(&self) -> &str {
        &self.server.host
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    #[serde(default = "ServerConfig::default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    const fn default_port() -> u16 {
        8080
    }

    const fn default_request_timeout() -> u64 {
        10
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_secs: Self::default_request_timeout(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default)]
    pub file: LogFileConfig,
    /// 是否输出 JSON 结构化日志
    #[serde(default)]
    pub structured: Option<bool>,
    /// 按 target 覆盖日志级别，例如 `build_info_server::api: debug`
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            file: LogFileConfig::default(),
            structured: None,
            overrides: HashMap::new(),
        }
    }
}

/// 日志文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFileConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "LogFileConfig::default_directory")]
    pub directory: String,
    #[serde(default)]
    pub retention_days: Option<u32>,
}

impl LogFileConfig {
    fn default_directory() -> String {
        "logs".to_string()
    }
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: Self::default_directory(),
            retention_days: Some(7),
        }
    }
}

/// 构建信息解析配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub source: SourceMode,
    #[serde(default)]
    pub refresh: RefreshMode,
    /// 轮询刷新间隔（秒），0 表示关闭
    #[serde(default)]
    pub watch_interval_secs: u64,
}

/// 取值来源模式，部署时确定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// 应用配置 → 默认值
    #[default]
    Named,
    /// 应用配置 → 环境变量 → 默认值
    Environment,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Named => "named",
            SourceMode::Environment => "environment",
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "named" => Ok(SourceMode::Named),
            "environment" | "env" => Ok(SourceMode::Environment),
            other => Err(anyhow::anyhow!("未知的取值来源模式: {}", other)),
        }
    }
}

/// 刷新模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// 启动时解析一次，进程生命周期内不变
    Static,
    /// 每次读取都重新解析
    #[default]
    Live,
}

impl RefreshMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshMode::Static => "static",
            RefreshMode::Live => "live",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(RefreshMode::Static),
            "live" => Ok(RefreshMode::Live),
            other => Err(anyhow::anyhow!("未知的刷新模式: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.get_port(), 8080);
        assert_eq!(config.bind_host(), "0.0.0.0");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.resolution.source, SourceMode::Named);
        assert_eq!(config.resolution.refresh, RefreshMode::Live);
        assert_eq!(config.resolution.watch_interval_secs, 0);
    }

    #[test]
    fn test_build_section_is_ignored_by_typed_config() {
        let yaml = r#"
server:
  port: 9090
resolution:
  source: environment
  refresh: static
build:
  id: "2001"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.get_port(), 9090);
        assert_eq!(config.resolution.source, SourceMode::Environment);
        assert_eq!(config.resolution.refresh, RefreshMode::Static);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("ENV".parse::<SourceMode>().unwrap(), SourceMode::Environment);
        assert_eq!(" live ".parse::<RefreshMode>().unwrap(), RefreshMode::Live);
        assert!("sometimes".parse::<RefreshMode>().is_err());
    }
}
