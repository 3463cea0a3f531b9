//! 内存版用户仓库

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::traits::{RepositoryError, RepositoryResult, UserRepository};
use crate::model::User;

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    documents: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, mut user: User) -> RepositoryResult<User> {
        let mut documents = self.documents.write();

        let id = user
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Some(email) = user.normalized_email() {
            let taken = documents.values().any(|other| {
                other.id.as_deref() != Some(id.as_str())
                    && other.normalized_email().as_deref() == Some(email.as_str())
            });
            if taken {
                return Err(RepositoryError::DuplicateKey {
                    field: "email",
                    value: email,
                });
            }
        }

        let now = Utc::now();
        user.created_at = documents
            .get(&id)
            .and_then(|existing| existing.created_at)
            .or(user.created_at)
            .or(Some(now));
        user.updated_at = Some(now);
        user.id = Some(id.clone());

        debug!(event = "repository.user.save", id = %id);
        documents.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>> {
        Ok(self.documents.read().get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let wanted = email.trim().to_lowercase();
        Ok(self
            .documents
            .read()
            .values()
            .find(|user| user.normalized_email().as_deref() == Some(wanted.as_str()))
            .cloned())
    }

    async fn find_all(&self) -> RepositoryResult<Vec<User>> {
        let mut users: Vec<User> = self.documents.read().values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn delete_by_id(&self, id: &str) -> RepositoryResult<bool> {
        Ok(self.documents.write().remove(id).is_some())
    }

    async fn count(&self) -> RepositoryResult<usize> {
        Ok(self.documents.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Address;

    fn user_with_email(email: &str) -> User {
        User {
            first_name: Some("Ada".into()),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_timestamps() {
        let repo = InMemoryUserRepository::new();
        let saved = repo.save(user_with_email("ada@example.com")).await.unwrap();

        let id = saved.id.clone().unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert!(saved.created_at.is_some());
        assert_eq!(saved.created_at, saved.updated_at);
        assert_eq!(repo.find_by_id(&id).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let repo = InMemoryUserRepository::new();
        let first = repo.save(User::new("u1", "Ada", "Lovelace")).await.unwrap();

        let mut changed = first.clone();
        changed.created_at = None;
        changed.address = Some(Address {
            city: Some("London".into()),
            ..Default::default()
        });
        let second = repo.save(changed).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_email_is_unique_case_insensitive() {
        let repo = InMemoryUserRepository::new();
        repo.save(user_with_email("ada@example.com")).await.unwrap();

        let err = repo
            .save(user_with_email("ADA@example.com"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::DuplicateKey {
                field: "email",
                value: "ada@example.com".into()
            }
        );

        let found = repo.find_by_email("Ada@Example.com").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_delete_and_find_all() {
        let repo = InMemoryUserRepository::new();
        let a = repo.save(user_with_email("a@example.com")).await.unwrap();
        repo.save(user_with_email("b@example.com")).await.unwrap();

        assert_eq!(repo.find_all().await.unwrap().len(), 2);
        assert!(repo.delete_by_id(a.id.as_deref().unwrap()).await.unwrap());
        assert!(!repo.delete_by_id("missing").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
