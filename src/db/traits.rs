use async_trait::async_trait;
use thiserror::Error;

use crate::model::User;

/// 仓库错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("唯一约束冲突: {field}={value}")]
    DuplicateKey { field: &'static str, value: String },
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// 用户文档仓库
///
/// 实现方负责：缺省 id 的分配、`createdAt` 首次写入、`updatedAt` 每次刷新，
/// 以及 email 唯一约束（不区分大小写）。
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 插入或按 id 覆盖，返回落库后的文档
    async fn save(&self, user: User) -> RepositoryResult<User>;

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn find_all(&self) -> RepositoryResult<Vec<User>>;

    /// 返回是否确实删除了文档
    async fn delete_by_id(&self, id: &str) -> RepositoryResult<bool>;

    async fn count(&self) -> RepositoryResult<usize>;
}
