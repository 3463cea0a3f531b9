// 文档存储抽象层模块

pub mod memory;
pub mod traits;

pub use memory::InMemoryUserRepository;
pub use traits::{RepositoryError, RepositoryResult, UserRepository};
