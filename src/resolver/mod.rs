//! 构建信息解析
//!
//! 按优先级依次探测：应用配置 → 环境变量（仅 environment 模式）→ 编译期默认值。
//! 解析结果以 [`ResolvedBuildInfo`] 快照的形式整体发布，读者拿到的永远是某一次
//! 完整解析的结果。

pub mod refresh;
pub mod source;

pub use refresh::{
    request_refresh, spawn_refresh_listener, spawn_signal_listener, spawn_watch, RefreshRequest,
    RefreshTrigger,
};
pub use source::{EnvSource, MapSource, Properties, PropertySource, SourceError, YamlFileSource};

use crate::model::ResolvedBuildInfo;
use crate::util::config::{RefreshMode, ResolutionConfig, SourceMode};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 一个构建信息字段的取值规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    /// 应用配置中的键
    pub key: &'static str,
    /// environment 模式下的回退变量
    pub env_var: Option<&'static str>,
    pub default: &'static str,
}

pub const BUILD_ID: KeyBinding = KeyBinding {
    key: "build.id",
    env_var: Some("OS"),
    default: "100",
};

pub const BUILD_VERSION: KeyBinding = KeyBinding {
    key: "build.version",
    env_var: Some("USERPROFILE"),
    default: "1.0.0",
};

pub const BUILD_NAME: KeyBinding = KeyBinding {
    key: "build.name",
    env_var: Some("JAVA_HOME"),
    default: "Default-Build",
};

pub const BUILD_TYPE: KeyBinding = KeyBinding {
    key: "build.type",
    env_var: None,
    default: "Default",
};

/// 刷新结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 已重新解析，附带发生变化的键
    Refreshed { changed: Vec<String> },
    /// static 模式不接受刷新
    Ignored,
    /// 来源不可用，沿用上一次快照
    Failed { reason: String },
}

/// 已发布的快照及其解析序号
struct Published {
    generation: u64,
    info: Arc<ResolvedBuildInfo>,
}

/// 分层配置解析器
pub struct ConfigValueResolver {
    application: Arc<dyn PropertySource>,
    environment: Arc<dyn PropertySource>,
    source_mode: SourceMode,
    refresh_mode: RefreshMode,
    snapshot: RwLock<Published>,
    /// 每次读取来源前递增；序号更小的解析结果不会覆盖更新的快照
    generation: AtomicU64,
}

impl ConfigValueResolver {
    /// 创建解析器并立即解析一次。首次解析失败时以默认值起步。
    pub fn new(
        application: Arc<dyn PropertySource>,
        environment: Arc<dyn PropertySource>,
        source_mode: SourceMode,
        refresh_mode: RefreshMode,
    ) -> Self {
        let resolver = Self {
            application,
            environment,
            source_mode,
            refresh_mode,
            snapshot: RwLock::new(Published {
                generation: 0,
                info: Arc::new(Self::defaults()),
            }),
            generation: AtomicU64::new(0),
        };

        let generation = resolver.begin_read();
        match resolver.try_resolve_snapshot() {
            Ok(initial) => {
                info!(
                    event = "resolver.init",
                    source_mode = %source_mode,
                    refresh_mode = %refresh_mode,
                    snapshot = %initial
                );
                resolver.publish(generation, initial);
            }
            Err(e) => {
                warn!(
                    event = "resolver.init_degraded",
                    error = %e,
                    "初始解析失败，使用编译期默认值"
                );
            }
        }

        resolver
    }

    /// 使用应用配置文件和进程环境构建
    pub fn from_config(resolution: &ResolutionConfig, config_path: &Path) -> Self {
        Self::new(
            Arc::new(YamlFileSource::new(config_path)),
            Arc::new(EnvSource),
            resolution.source,
            resolution.refresh,
        )
    }

    pub fn bindings() -> [KeyBinding; 4] {
        [BUILD_ID, BUILD_VERSION, BUILD_NAME, BUILD_TYPE]
    }

    /// 已知配置键的取值规则
    pub fn binding_for(key: &str) -> Option<KeyBinding> {
        Self::bindings().into_iter().find(|binding| binding.key == key)
    }

    /// 全部字段取默认值的快照
    pub fn defaults() -> ResolvedBuildInfo {
        ResolvedBuildInfo {
            build_id: BUILD_ID.default.to_string(),
            build_version: BUILD_VERSION.default.to_string(),
            build_name: BUILD_NAME.default.to_string(),
            build_type: BUILD_TYPE.default.to_string(),
        }
    }

    pub fn source_mode(&self) -> SourceMode {
        self.source_mode
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        self.refresh_mode
    }

    /// 按优先级解析单个键，永不失败
    ///
    /// environment 模式下回退到该键绑定的环境变量；未知键没有环境变量回退。
    pub fn resolve(&self, key: &str, default: &str) -> String {
        let env_var = Self::binding_for(key).and_then(|binding| binding.env_var);
        let application = Self::read_or_empty(self.application.as_ref(), key);
        let environment = match self.source_mode {
            SourceMode::Environment => Some(Self::read_or_empty(self.environment.as_ref(), key)),
            SourceMode::Named => None,
        };

        pick(&application, environment.as_ref(), key, env_var, default)
    }

    fn read_or_empty(source: &dyn PropertySource, key: &str) -> Properties {
        source.properties().unwrap_or_else(|e| {
            debug!(event = "resolver.probe_failed", source = source.name(), key, error = %e);
            Properties::default()
        })
    }

    /// 当前快照
    ///
    /// live 模式下每次调用都重新解析；来源不可用时返回上一次成功的快照。
    pub fn current(&self) -> Arc<ResolvedBuildInfo> {
        if self.refresh_mode == RefreshMode::Static {
            return self.last_snapshot();
        }

        let generation = self.begin_read();
        match self.try_resolve_snapshot() {
            Ok(next) => self.publish(generation, next).0,
            Err(e) => {
                warn!(
                    event = "resolver.source_unavailable",
                    error = %e,
                    "配置来源不可用，返回上一次快照"
                );
                self.last_snapshot()
            }
        }
    }

    /// 最近一次发布的快照，不触发解析
    pub fn last_snapshot(&self) -> Arc<ResolvedBuildInfo> {
        self.snapshot.read().info.clone()
    }

    /// 响应外部刷新事件
    pub fn refresh(&self, trigger: &RefreshTrigger) -> RefreshOutcome {
        if self.refresh_mode == RefreshMode::Static {
            info!(event = "resolver.refresh_ignored", trigger = %trigger, "static 模式忽略刷新");
            return RefreshOutcome::Ignored;
        }

        let generation = self.begin_read();
        match self.try_resolve_snapshot() {
            Ok(next) => {
                let (_, changed) = self.publish(generation, next);
                info!(
                    event = "resolver.refreshed",
                    trigger = %trigger,
                    changed = ?changed
                );
                RefreshOutcome::Refreshed { changed }
            }
            Err(e) => {
                warn!(event = "resolver.refresh_failed", trigger = %trigger, error = %e);
                RefreshOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// 在读取来源之前领取序号
    fn begin_read(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 发布解析结果，返回发布后的快照与变化的键
    ///
    /// 序号不比已发布快照新的结果被丢弃，变化列表为空。
    fn publish(
        &self,
        generation: u64,
        next: ResolvedBuildInfo,
    ) -> (Arc<ResolvedBuildInfo>, Vec<String>) {
        let mut guard = self.snapshot.write();
        if generation <= guard.generation {
            debug!(
                event = "resolver.stale_discarded",
                generation,
                published = guard.generation
            );
            return (guard.info.clone(), Vec::new());
        }

        guard.generation = generation;
        let changed = next.changed_keys(&guard.info);
        if !changed.is_empty() {
            debug!(event = "resolver.snapshot_changed", changed = ?changed);
            guard.info = Arc::new(next);
        }
        (guard.info.clone(), changed)
    }

    /// 每个来源只读取一次，保证快照内字段一致
    fn try_resolve_snapshot(&self) -> Result<ResolvedBuildInfo, SourceError> {
        let application = self.application.properties()?;
        let environment = match self.source_mode {
            SourceMode::Environment => Some(self.environment.properties()?),
            SourceMode::Named => None,
        };

        let value = |binding: KeyBinding| {
            pick(
                &application,
                environment.as_ref(),
                binding.key,
                binding.env_var,
                binding.default,
            )
        };

        Ok(ResolvedBuildInfo {
            build_id: value(BUILD_ID),
            build_version: value(BUILD_VERSION),
            build_name: value(BUILD_NAME),
            build_type: value(BUILD_TYPE),
        })
    }
}

/// 应用配置 → 环境变量（仅传入时）→ 默认值
fn pick(
    application: &Properties,
    environment: Option<&Properties>,
    key: &str,
    env_var: Option<&str>,
    default: &str,
) -> String {
    application
        .get(key)
        .or_else(|| environment?.get(env_var?))
        .unwrap_or(default)
        .to_string()
}
