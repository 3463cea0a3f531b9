//! 配置管理模块
//! 负责配置文件的查找、加载、验证和日志初始化

use crate::util::config::{
    Config, ConfigLoader, ConfigValidator, ConfigWriter, ValidationReport,
};
use crate::util::log::{cleanup_old_logs, log_init_with_config};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// 日志文件前缀
pub const LOG_FILE_PREFIX: &str = "build-info-server";

/// 显式指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "BUILD_INFO_CONFIG";

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 加载和验证配置
    ///
    /// 文件不存在时写出模板并使用默认值；文件存在但无法解析时返回错误。
    pub fn load_and_validate(config_path: &Path) -> Result<(Config, ValidationReport)> {
        info!(event = "config.load.start", path = %config_path.display());

        let config = match ConfigLoader::load_with_env_overrides(config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("[warn] 配置文件读取失败: {} - {:#}", config_path.display(), e);
                Self::handle_config_load_failure(config_path)?
            }
        };

        let report = ConfigValidator::validate_all(&config);
        Ok((config, report))
    }

    /// 只读加载：文件不存在时使用模板默认值，不落盘
    pub fn load_read_only(config_path: &Path) -> Result<Config> {
        if config_path.exists() {
            ConfigLoader::load_with_env_overrides(config_path)
        } else {
            info!(event = "config.load.absent", path = %config_path.display());
            Ok(ConfigLoader::apply_env_overrides(
                ConfigWriter::generate_template(),
            ))
        }
    }

    /// 输出验证报告
    pub fn log_validation_report(report: &ValidationReport) {
        for error in &report.errors {
            warn!(event = "config.validation.error", field = %error.field, message = %error.message);
        }
        for warning in &report.warnings {
            warn!(event = "config.validation.warning", field = %warning.field, message = %warning.message);
        }
        for item in &report.info {
            info!(event = "config.validation.info", field = %item.field, message = %item.message);
        }
    }

    /// 初始化日志系统，并按保留天数清理旧日志
    pub fn initialize_logging(config: &Config) -> Result<Option<WorkerGuard>> {
        let log_guard = log_init_with_config(LOG_FILE_PREFIX, &config.logging)?;

        if let Some(retention_days) = config.logging.file.retention_days {
            if config.logging.file.enabled {
                let log_path = Path::new(&config.logging.file.directory);
                if let Err(e) = cleanup_old_logs(log_path, LOG_FILE_PREFIX, retention_days) {
                    warn!("日志清理失败: {}", e);
                }
            }
        }

        Ok(log_guard)
    }

    /// 查找配置文件路径，适应开发和生产环境
    pub fn find_config_file_path(filename: &str) -> PathBuf {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            if !explicit.trim().is_empty() {
                return PathBuf::from(explicit);
            }
        }

        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::search_config_from(&current_dir, filename)
    }

    /// 在给定目录下按约定顺序查找
    fn search_config_from(current_dir: &Path, filename: &str) -> PathBuf {
        // 1. 当前目录的 config/ 子目录
        let config_in_current = current_dir.join("config").join(filename);
        if config_in_current.exists() {
            return config_in_current;
        }

        // 2. 在 bin/ 下运行时，上级目录的 config/
        if let Some(parent) = current_dir.parent() {
            let config_in_parent = parent.join("config").join(filename);
            if config_in_parent.exists() {
                return config_in_parent;
            }
        }

        // 3. 当前目录
        let dev_path = current_dir.join(filename);
        if dev_path.exists() {
            return dev_path;
        }

        // 都不存在：bin/ 下返回上级 config/，否则当前目录
        if current_dir.file_name() == Some(std::ffi::OsStr::new("bin")) {
            if let Some(parent) = current_dir.parent() {
                return parent.join("config").join(filename);
            }
        }
        dev_path
    }

    /// 处理配置加载失败
    fn handle_config_load_failure(config_path: &Path) -> Result<Config> {
        if !config_path.exists() {
            info!("[note] 创建默认配置文件: {}", config_path.display());
            let template = ConfigWriter::generate_template();
            if let Err(write_err) = ConfigWriter::write_yaml_with_dir(&template, config_path) {
                warn!("[fail] 创建默认配置文件失败: {}", write_err);
            }
            Ok(ConfigLoader::apply_env_overrides(template))
        } else {
            Err(anyhow::anyhow!(
                "配置文件解析失败，请检查语法: {}",
                config_path.display()
            ))
        }
    }
}
