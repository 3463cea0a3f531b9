use serde::{Deserialize, Serialize};
use std::fmt;

/// 一次读取可见的完整构建信息快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBuildInfo {
    pub build_id: String,
    pub build_version: String,
    pub build_name: String,
    pub build_type: String,
}

impl ResolvedBuildInfo {
    /// 按 id / version / name / type 顺序给出 (配置键, 值)
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("build.id", self.build_id.as_str()),
            ("build.version", self.build_version.as_str()),
            ("build.name", self.build_name.as_str()),
            ("build.type", self.build_type.as_str()),
        ]
    }

    /// 与另一个快照相比发生变化的配置键
    pub fn changed_keys(&self, other: &ResolvedBuildInfo) -> Vec<String> {
        self.entries()
            .iter()
            .zip(other.entries().iter())
            .filter(|(a, b)| a.1 != b.1)
            .map(|(a, _)| a.0.to_string())
            .collect()
    }
}

impl fmt::Display for ResolvedBuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BuildId: {} | Version: {} | Name: {} | Type: {}",
            self.build_id, self.build_version, self.build_name, self.build_type
        )
    }
}

/// `GET /build-info` 的响应文本
pub fn format(info: &ResolvedBuildInfo) -> String {
    info.to_string()
}
