//! Login history recording and queries

use super::models::{LoginEvent, LoginEventType, User};
use super::repository::{LoginHistoryRepository, RepositoryError};
use crate::audit::ClientContext;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use zhiri_core::{Page, PageRequest};

/// Failure reasons stored with unsuccessful login attempts
pub mod failure_reason {
    pub const USER_NOT_FOUND: &str = "user not found";
    pub const ACCOUNT_DEACTIVATED: &str = "account deactivated";
    pub const WRONG_PASSWORD: &str = "wrong password";
}

/// Who a login attempt was made for
#[derive(Debug, Clone, Copy)]
pub enum LoginSubject<'a> {
    /// The email resolved to a stored user
    Known { user_id: Uuid, email: &'a str },
    /// Nothing matched; only the attempted email is kept
    Unknown { email: &'a str },
}

impl<'a> LoginSubject<'a> {
    fn user_id(&self) -> Option<Uuid> {
        match self {
            LoginSubject::Known { user_id, .. } => Some(*user_id),
            LoginSubject::Unknown { .. } => None,
        }
    }

    fn email(&self) -> &'a str {
        match self {
            LoginSubject::Known { email, .. } | LoginSubject::Unknown { email } => email,
        }
    }
}

impl<'a> From<&'a User> for LoginSubject<'a> {
    fn from(user: &'a User) -> Self {
        LoginSubject::Known {
            user_id: user.id,
            email: &user.email,
        }
    }
}

pub struct LoginHistoryService {
    store: Arc<dyn LoginHistoryRepository>,
}

impl LoginHistoryService {
    pub fn new(store: Arc<dyn LoginHistoryRepository>) -> Self {
        Self { store }
    }

    /// Append one LOGIN event
    ///
    /// The failure reason is kept only for unsuccessful attempts.
    pub async fn record_login(
        &self,
        subject: LoginSubject<'_>,
        success: bool,
        failure_reason: Option<&str>,
        client: &ClientContext,
    ) -> Result<(), RepositoryError> {
        let event = LoginEvent {
            id: Uuid::new_v4(),
            user_id: subject.user_id(),
            email: subject.email().to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            event_type: LoginEventType::Login,
            success,
            failure_reason: failure_reason.filter(|_| !success).map(str::to_string),
            created_at: Utc::now(),
        };
        self.store.append(event).await
    }

    /// Append one successful LOGOUT event
    pub async fn record_logout(
        &self,
        user_id: Uuid,
        email: &str,
        client: &ClientContext,
    ) -> Result<(), RepositoryError> {
        let event = LoginEvent {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            email: email.to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            event_type: LoginEventType::Logout,
            success: true,
            failure_reason: None,
            created_at: Utc::now(),
        };
        self.store.append(event).await
    }

    /// A user's events, newest first
    pub async fn history(
        &self,
        user_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<LoginEvent>, RepositoryError> {
        self.store.find_by_user(user_id, request).await
    }

    pub async fn total_successful_logins(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        self.store.count_successful_logins(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::InMemoryLoginHistoryRepository;

    fn service() -> (LoginHistoryService, Arc<InMemoryLoginHistoryRepository>) {
        let store = Arc::new(InMemoryLoginHistoryRepository::new());
        (LoginHistoryService::new(store.clone()), store)
    }

    fn client() -> ClientContext {
        ClientContext {
            ip_address: Some("203.0.113.5".to_string()),
            user_agent: Some("curl/8.0".to_string()),
        }
    }

    #[tokio::test]
    async fn test_unknown_subject_has_no_user_id() {
        let (service, store) = service();

        service
            .record_login(
                LoginSubject::Unknown { email: "ghost@x.com" },
                false,
                Some(failure_reason::USER_NOT_FOUND),
                &client(),
            )
            .await
            .unwrap();

        let events = store.all().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, None);
        assert_eq!(events[0].email, "ghost@x.com");
        assert_eq!(events[0].failure_reason.as_deref(), Some("user not found"));
        assert_eq!(events[0].ip_address.as_deref(), Some("203.0.113.5"));
    }

    #[tokio::test]
    async fn test_success_drops_failure_reason() {
        let (service, store) = service();
        let user_id = Uuid::new_v4();

        service
            .record_login(
                LoginSubject::Known { user_id, email: "a@x.com" },
                true,
                Some(failure_reason::WRONG_PASSWORD),
                &client(),
            )
            .await
            .unwrap();

        let events = store.all().await;
        assert!(events[0].success);
        assert_eq!(events[0].failure_reason, None);
    }

    #[tokio::test]
    async fn test_stats_count_only_successful_logins() {
        let (service, _) = service();
        let user_id = Uuid::new_v4();
        let subject = LoginSubject::Known { user_id, email: "a@x.com" };

        service.record_login(subject, true, None, &client()).await.unwrap();
        service
            .record_login(subject, false, Some(failure_reason::WRONG_PASSWORD), &client())
            .await
            .unwrap();
        service.record_login(subject, true, None, &client()).await.unwrap();
        service.record_logout(user_id, "a@x.com", &client()).await.unwrap();

        assert_eq!(service.total_successful_logins(user_id).await.unwrap(), 2);

        let page = service.history(user_id, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 4);
        assert_eq!(page.content[0].event_type, LoginEventType::Logout);
    }
}
