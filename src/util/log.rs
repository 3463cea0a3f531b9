use crate::util::config::LoggingConfig;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter::EnvFilter, Layer, Registry};

/// 按配置初始化日志：控制台必开，文件按 `file.enabled` 决定。
///
/// 返回的 guard 必须存活到进程退出，否则文件日志会丢失尾部。
pub fn log_init_with_config(
    file_prefix: &str,
    config: &LoggingConfig,
) -> anyhow::Result<Option<WorkerGuard>> {
    let level_filter = parse_level(&config.level);
    let filter_expression = build_env_filter_expression(level_filter, &config.overrides);
    let use_json = config.structured.unwrap_or(false);

    let stdout_filter = EnvFilter::try_new(filter_expression.as_str())
        .unwrap_or_else(|_| EnvFilter::new(level_filter_to_str(level_filter)));

    if !config.file.enabled {
        let stdout_layer = if use_json {
            layer()
                .json()
                .with_writer(io::stdout)
                .with_filter(stdout_filter)
                .boxed()
        } else {
            layer()
                .with_target(false)
                .with_writer(io::stdout)
                .with_filter(stdout_filter)
                .boxed()
        };

        Registry::default().with(stdout_layer).try_init()?;
        tracing::info!(event = "log.init", level = %config.level, console = true, file = false, structured = use_json);
        return Ok(None);
    }

    let log_dir = resolve_log_dir(&config.file.directory);
    std::fs::create_dir_all(&log_dir)?;

    let file_filter = EnvFilter::try_new(filter_expression.as_str())
        .unwrap_or_else(|_| EnvFilter::new(level_filter_to_str(level_filter)));
    let file_appender = daily(&log_dir, format!("{}.log", file_prefix));
    let (no_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let (stdout_layer, file_layer) = if use_json {
        (
            layer()
                .json()
                .with_writer(io::stdout)
                .with_filter(stdout_filter)
                .boxed(),
            layer()
                .json()
                .with_ansi(false)
                .with_writer(no_blocking)
                .with_filter(file_filter)
                .boxed(),
        )
    } else {
        (
            layer()
                .with_target(false)
                .with_writer(io::stdout)
                .with_filter(stdout_filter)
                .boxed(),
            layer()
                .with_ansi(false)
                .with_writer(no_blocking)
                .with_filter(file_filter)
                .boxed(),
        )
    };

    Registry::default()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        event = "log.init",
        level = %config.level,
        console = true,
        file = true,
        directory = %log_dir.display(),
        rotation = "daily",
        structured = use_json
    );
    if let Some(retention) = config.file.retention_days {
        tracing::info!(event = "log.retention", days = retention);
    }

    Ok(Some(guard))
}

/// 相对路径基于工作目录；在 bin/ 下运行时使用上级目录
fn resolve_log_dir(directory: &str) -> PathBuf {
    let path = Path::new(directory);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if current_dir.file_name() == Some(std::ffi::OsStr::new("bin")) {
        if let Some(parent) = current_dir.parent() {
            return parent.join(directory);
        }
    }
    current_dir.join(directory)
}

/// 删除超过保留天数的日志文件，只处理带 `file_prefix` 的文件
pub fn cleanup_old_logs(log_dir: &Path, file_prefix: &str, retention_days: u32) -> anyhow::Result<usize> {
    if !log_dir.exists() {
        tracing::debug!("日志目录不存在: {}", log_dir.display());
        return Ok(0);
    }

    let retention = std::time::Duration::from_secs(retention_days as u64 * 24 * 60 * 60);
    let cutoff = std::time::SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(std::time::UNIX_EPOCH);

    let mut deleted_count = 0;
    let mut error_count = 0;

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("");
        if !file_name.starts_with(file_prefix) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata
            .modified()
            .unwrap_or_else(|_| std::time::SystemTime::now());
        if modified < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    deleted_count += 1;
                    tracing::debug!("已删除过期日志: {}", path.display());
                }
                Err(e) => {
                    error_count += 1;
                    tracing::warn!("删除日志文件失败: {} - {}", path.display(), e);
                }
            }
        }
    }

    if deleted_count > 0 {
        tracing::info!(event = "log.cleanup", deleted = deleted_count, retention_days);
    }
    if error_count > 0 {
        tracing::warn!("有 {} 个文件清理失败", error_count);
    }

    Ok(deleted_count)
}

fn parse_level(level: &str) -> LevelFilter {
    match normalize_level_str(level) {
        Some("trace") => LevelFilter::TRACE,
        Some("debug") => LevelFilter::DEBUG,
        Some("warn") => LevelFilter::WARN,
        Some("error") => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn build_env_filter_expression(
    default_level: LevelFilter,
    overrides: &HashMap<String, String>,
) -> String {
    let mut directives = vec![level_filter_to_str(default_level).to_string()];

    let mut targets: Vec<_> = overrides.iter().collect();
    targets.sort_by(|a, b| a.0.cmp(b.0));
    for (target, level_str) in targets {
        if let Some(level) = normalize_level_str(level_str) {
            directives.push(format!("{}={level}", normalize_directive_target(target)));
        }
    }

    directives.join(",")
}

fn normalize_level_str(level: &str) -> Option<&'static str> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

fn normalize_directive_target(target: &str) -> String {
    target.trim().replace('-', "_")
}

fn level_filter_to_str(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::OFF => "off",
        LevelFilter::ERROR => "error",
        LevelFilter::WARN => "warn",
        LevelFilter::DEBUG => "debug",
        LevelFilter::TRACE => "trace",
        _ => "info",
    }
}
