//! In-memory stores
//!
//! Used by tests and by `ZHIRI_STORAGE=memory` development runs. Contents
//! are lost when the process exits.

use super::models::{LoginEvent, LoginEventType, NewUser, RevokedToken, User};
use super::repository::{
    LoginHistoryRepository, RepositoryError, RevokedTokenRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use zhiri_core::{Page, PageRequest};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a stored user record wholesale
    pub async fn put(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::DatabaseError(format!("no user {id}")))?;
        user.is_active = is_active;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == new_user.email) {
            return Err(RepositoryError::EmailAlreadyExists);
        }
        if users.values().any(|u| u.phone == new_user.phone) {
            return Err(RepositoryError::PhoneAlreadyExists);
        }

        let user = new_user.into_user();
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login = Some(at);
            user.updated_at = at;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRevokedTokenRepository {
    entries: RwLock<HashMap<String, RevokedToken>>,
}

impl InMemoryRevokedTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RevokedTokenRepository for InMemoryRevokedTokenRepository {
    async fn insert(&self, entry: RevokedToken) -> Result<bool, RepositoryError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.token) {
            return Ok(false);
        }
        entries.insert(entry.token.clone(), entry);
        Ok(true)
    }

    async fn contains(&self, token: &str) -> Result<bool, RepositoryError> {
        Ok(self.entries.read().await.contains_key(token))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        Ok((before - entries.len()) as u64)
    }
}

/// Append-only event list in insertion order
#[derive(Default)]
pub struct InMemoryLoginHistoryRepository {
    events: RwLock<Vec<LoginEvent>>,
}

impl InMemoryLoginHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored event, oldest first
    pub async fn all(&self) -> Vec<LoginEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl LoginHistoryRepository for InMemoryLoginHistoryRepository {
    async fn append(&self, event: LoginEvent) -> Result<(), RepositoryError> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<LoginEvent>, RepositoryError> {
        let events = self.events.read().await;

        // Newest insertion first; the stable sort keeps that order for equal timestamps
        let mut matching: Vec<&LoginEvent> = events
            .iter()
            .rev()
            .filter(|e| e.user_id == Some(user_id))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let content = matching
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .cloned()
            .collect();

        Ok(Page::new(content, request, total))
    }

    async fn count_successful_logins(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let events = self.events.read().await;
        let count = events
            .iter()
            .filter(|e| {
                e.user_id == Some(user_id) && e.success && e.event_type == LoginEventType::Login
            })
            .count();
        Ok(count as u64)
    }
}
