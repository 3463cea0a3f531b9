//! 配置来源
//!
//! 每个来源都能给出一份扁平化的 [`Properties`] 视图。解析器对每个来源只读取
//! 一次视图，再从中取出全部键，因此同一个快照里的字段来自同一时刻。

use parking_lot::RwLock;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 来源读取失败
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("配置来源 {source_name} 不可用: {reason}")]
    Unavailable { source_name: String, reason: String },
    #[error("配置来源 {source_name} 解析失败: {reason}")]
    Parse { source_name: String, reason: String },
}

/// 扁平化的键值视图，键使用 `a.b.c` 形式
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取非空值；空串或纯空白视为未配置
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 将 YAML 文档展开为扁平键
    pub fn from_yaml(value: &Value) -> Self {
        let mut properties = Self::new();
        flatten_into(&mut properties.0, String::new(), value);
        properties
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(prefix, b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix, n.to_string());
        }
        Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        Value::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(out, format!("{prefix}[{index}]"), item);
            }
        }
        Value::Mapping(map) => {
            for (key, item) in map {
                let Some(segment) = scalar_key(key) else {
                    continue;
                };
                let next = if prefix.is_empty() {
                    segment
                } else {
                    format!("{prefix}.{segment}")
                };
                flatten_into(out, next, item);
            }
        }
        Value::Tagged(tagged) => flatten_into(out, prefix, &tagged.value),
    }
}

fn scalar_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 配置来源
pub trait PropertySource: Send + Sync {
    fn name(&self) -> &str;

    /// 当前视图；返回错误表示后端存储不可达
    fn properties(&self) -> Result<Properties, SourceError>;
}

/// 应用配置文件来源，每次读取都重新加载文件
#[derive(Debug, Clone)]
pub struct YamlFileSource {
    path: PathBuf,
}

impl YamlFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PropertySource for YamlFileSource {
    fn name(&self) -> &str {
        "application"
    }

    fn properties(&self) -> Result<Properties, SourceError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| SourceError::Unavailable {
                source_name: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        if content.trim().is_empty() {
            return Ok(Properties::new());
        }

        let value: Value = serde_yaml::from_str(&content).map_err(|e| SourceError::Parse {
            source_name: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Properties::from_yaml(&value))
    }
}

/// 进程环境变量来源
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl PropertySource for EnvSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn properties(&self) -> Result<Properties, SourceError> {
        // 非 UTF-8 的变量直接跳过
        Ok(std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect())
    }
}

/// 内存键值存储，可在运行时修改
#[derive(Debug, Default)]
pub struct MapSource {
    name: String,
    entries: RwLock<Properties>,
}

impl MapSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(Properties::new()),
        }
    }

    pub fn with_entries<K, V>(name: impl Into<String>, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key, value);
    }

    pub fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// 一次性替换全部内容
    pub fn replace_all(&self, properties: Properties) {
        *self.entries.write() = properties;
    }
}

impl PropertySource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> Result<Properties, SourceError> {
        Ok(self.entries.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flatten_nested_yaml() {
        let yaml: Value = serde_yaml::from_str(
            r#"
build:
  id: 2001
  name: "Release-Build"
  flags: [fast, true]
  empty: ~
server:
  port: 8080
"#,
        )
        .unwrap();

        let props = Properties::from_yaml(&yaml);
        assert_eq!(props.get("build.id"), Some("2001"));
        assert_eq!(props.get("build.name"), Some("Release-Build"));
        assert_eq!(props.get("build.flags[0]"), Some("fast"));
        assert_eq!(props.get("build.flags[1]"), Some("true"));
        assert_eq!(props.get("build.empty"), None);
        assert_eq!(props.get("server.port"), Some("8080"));
    }

    #[test]
    fn test_blank_values_count_as_absent() {
        let props: Properties = [("build.id", ""), ("build.name", "   ")].into_iter().collect();
        assert_eq!(props.get("build.id"), None);
        assert_eq!(props.get("build.name"), None);
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_yaml_file_source_reads_current_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        let source = YamlFileSource::new(&path);

        std::fs::write(&path, "build:\n  id: \"1\"\n").unwrap();
        assert_eq!(source.properties().unwrap().get("build.id"), Some("1"));

        std::fs::write(&path, "build:\n  id: \"2\"\n").unwrap();
        assert_eq!(source.properties().unwrap().get("build.id"), Some("2"));
    }

    #[test]
    fn test_yaml_file_source_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        let source = YamlFileSource::new(&path);

        assert!(matches!(
            source.properties(),
            Err(SourceError::Unavailable { .. })
        ));

        std::fs::write(&path, "build: [oops").unwrap();
        assert!(matches!(source.properties(), Err(SourceError::Parse { .. })));
    }

    #[test]
    fn test_empty_yaml_file_has_no_properties() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "").unwrap();

        let props = YamlFileSource::new(&path).properties().unwrap();
        assert!(props.is_empty());
    }

    #[test]
    fn test_env_source_sees_process_environment() {
        std::env::set_var("BUILD_INFO_SOURCE_TEST_MARKER", "present");
        let props = EnvSource.properties().unwrap();
        assert_eq!(props.get("BUILD_INFO_SOURCE_TEST_MARKER"), Some("present"));
        std::env::remove_var("BUILD_INFO_SOURCE_TEST_MARKER");
    }

    #[test]
    fn test_map_source_mutation() {
        let source = MapSource::with_entries("store", [("build.id", "5")]);
        source.set("build.type", "Nightly");
        source.remove("build.id");

        let props = source.properties().unwrap();
        assert_eq!(props.get("build.id"), None);
        assert_eq!(props.get("build.type"), Some("Nightly"));
        assert_eq!(source.name(), "store");
    }
}
