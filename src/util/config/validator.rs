//! 配置验证模块

use super::types::*;

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 执行全部检查
    pub fn validate_all(config: &Config) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_server_config(&config.server, &mut report);
        Self::validate_logging_config(&config.logging, &mut report);
        Self::validate_resolution_config(&config.resolution, &mut report);

        report
    }

    fn validate_server_config(config: &ServerConfig, report: &mut ValidationReport) {
        if config.port == 0 {
            report.add_error("server.port", "端口不能为0");
        } else if config.port < 1024 {
            report.add_warning("server.port", "使用了特权端口，可能需要管理员权限");
        }

        if config.host.trim().is_empty() {
            report.add_error("server.host", "监听地址不能为空");
        }

        if config.request_timeout_secs == 0 {
            report.add_error("server.request_timeout_secs", "请求超时必须大于0");
        }
    }

    fn validate_logging_config(config: &LoggingConfig, report: &mut ValidationReport) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.level.to_lowercase().as_str()) {
            report.add_error("logging.level", "无效的日志级别");
        }

        if config.file.enabled && config.file.directory.trim().is_empty() {
            report.add_error("logging.file.directory", "启用文件日志时目录不能为空");
        }
    }

    fn validate_resolution_config(config: &ResolutionConfig, report: &mut ValidationReport) {
        if config.refresh == RefreshMode::Static && config.watch_interval_secs > 0 {
            report.add_warning(
                "resolution.watch_interval_secs",
                "static 模式下轮询刷新不会生效",
            );
        }

        if config.source == SourceMode::Environment {
            report.add_info(
                "resolution.source",
                "启用环境变量回退: OS / USERPROFILE / JAVA_HOME",
            );
        }
    }
}

/// 配置验证报告
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub info: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue::new(field, message));
    }

    pub fn add_info(&mut self, field: &str, message: &str) {
        self.info.push(ValidationIssue::new(field, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }
}

/// 验证问题
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
