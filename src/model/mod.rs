pub mod build_info;
pub mod product;
pub mod user;

pub use build_info::{format, ResolvedBuildInfo};
pub use product::ProductRequest;
pub use user::{Address, User, UserRole};
