use std::sync::Arc;

use crate::config::AuthConfig;
use crate::entities::user::{NewUser, UserRecord};
use crate::store::{EventStore, StoreError};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use rally_sdk::objects::{AuthResponse, LoginRequest, RegisterRequest};
use rally_sdk::token::{self, TokenError};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::ServiceError;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Domain for guest email addresses. Never routable.
pub const GUEST_EMAIL_DOMAIN: &str = "guest.rally.local";

/// An issued bearer token and the user it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: UserRecord,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        AuthResponse {
            user: session.user.summary(),
            token: session.token,
        }
    }
}

/// Registration, login, guest sessions, and token verification.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn EventStore>,
    config: Arc<RwLock<AuthConfig>>,
}

impl AuthService {
    pub fn new(store: Arc<dyn EventStore>, config: Arc<RwLock<AuthConfig>>) -> Self {
        Self { store, config }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Session, ServiceError> {
        let name = request.name.trim().to_owned();
        let email = normalize_email(&request.email);
        if name.is_empty() || email.is_empty() || request.password.is_empty() {
            return Err(ServiceError::Validation(
                "name, email and password are required".into(),
            ));
        }
        if !email.contains('@') {
            return Err(ServiceError::Validation("invalid email address".into()));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash_password(request.password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                name,
                email,
                password_hash: Some(password_hash),
                is_guest: false,
            })
            .await
            .map_err(|e| match e {
                StoreError::EmailTaken => {
                    ServiceError::Validation("email already registered".into())
                }
                other => ServiceError::Infra(other),
            })?;

        info!(user_id = %user.id, "user registered");
        self.issue(user).await
    }

    /// Check email and password. Every failure reads the same to the caller.
    pub async fn login(&self, request: LoginRequest) -> Result<Session, ServiceError> {
        let email = normalize_email(&request.email);
        let user = self.store.find_user_by_email(&email).await?;

        let Some(user) = user else {
            debug!("login for unknown email");
            return Err(invalid_credentials());
        };
        let Some(hash) = user.password_hash.clone() else {
            debug!(user_id = %user.id, "password login attempted for guest");
            return Err(invalid_credentials());
        };
        if !verify_password(request.password, hash).await? {
            debug!(user_id = %user.id, "wrong password");
            return Err(invalid_credentials());
        }

        info!(user_id = %user.id, "user logged in");
        self.issue(user).await
    }

    /// Create a fresh guest identity and a session for it.
    pub async fn guest(&self) -> Result<Session, ServiceError> {
        let id = Uuid::new_v4().simple().to_string();
        let short = &id[..8];
        let user = self
            .store
            .insert_user(NewUser {
                name: format!("Guest_{short}"),
                email: format!("guest_{id}@{GUEST_EMAIL_DOMAIN}"),
                password_hash: None,
                is_guest: true,
            })
            .await?;

        info!(user_id = %user.id, "guest session created");
        self.issue(user).await
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<UserRecord, ServiceError> {
        let claims = {
            let config = self.config.read().await;
            token::verify_token(token, config.secret_bytes())
        }
        .map_err(token_error)?;

        self.store
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| ServiceError::Authentication("user no longer exists".into()))
    }

    async fn issue(&self, user: UserRecord) -> Result<Session, ServiceError> {
        let config = self.config.read().await;
        let token = token::issue_token(user.id, config.token_ttl_secs, config.secret_bytes());
        Ok(Session { token, user })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Authentication("invalid credentials".into())
}

fn token_error(e: TokenError) -> ServiceError {
    match e {
        TokenError::Expired => ServiceError::Authentication("token expired".into()),
        _ => ServiceError::Authentication("invalid token".into()),
    }
}

async fn hash_password(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| ServiceError::Hash(e.to_string()))?
}

async fn verify_password(password: String, hash: String) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .map_err(|e| ServiceError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryEventStore;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryEventStore::new()),
            Arc::new(RwLock::new(AuthConfig::default())),
        )
    }

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service();
        let session = auth
            .register(register_request("Ada@Example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(session.user.email, "ada@example.com");
        assert!(!session.user.is_guest);
        assert_ne!(session.user.password_hash.as_deref(), Some("secret1"));

        let login = auth
            .login(LoginRequest {
                email: "ADA@example.com ".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        assert_eq!(login.user.id, session.user.id);

        let user = auth.authenticate(&login.token).await.unwrap();
        assert_eq!(user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let auth = service();
        auth.register(register_request("ada@example.com", "secret1"))
            .await
            .unwrap();
        let err = auth
            .register(register_request("ADA@example.com", "other-secret"))
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(msg) => assert_eq!(msg, "email already registered"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let auth = service();
        assert!(matches!(
            auth.register(register_request("", "secret1")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            auth.register(register_request("ada@example.com", "12345")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            auth.register(register_request("not-an-email", "secret1")).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let auth = service();
        auth.register(register_request("ada@example.com", "secret1"))
            .await
            .unwrap();

        let wrong_password = auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "secret2".into(),
            })
            .await
            .unwrap_err();
        let unknown = auth
            .login(LoginRequest {
                email: "bob@example.com".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), "invalid credentials");
        assert_eq!(unknown.to_string(), "invalid credentials");
    }

    #[tokio::test]
    async fn test_guest_sessions_are_distinct() {
        let auth = service();
        let first = auth.guest().await.unwrap();
        let second = auth.guest().await.unwrap();

        assert!(first.user.is_guest);
        assert!(first.user.name.starts_with("Guest_"));
        assert!(first.user.email.ends_with("@guest.rally.local"));
        assert!(first.user.password_hash.is_none());
        assert_ne!(first.user.id, second.user.id);
        assert_ne!(first.user.email, second.user.email);

        let guest = auth.authenticate(&second.token).await.unwrap();
        assert_eq!(guest.id, second.user.id);
    }

    #[tokio::test]
    async fn test_guest_cannot_password_login() {
        let auth = service();
        let guest = auth.guest().await.unwrap();
        let err = auth
            .login(LoginRequest {
                email: guest.user.email,
                password: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_tokens() {
        let auth = service();
        assert!(matches!(
            auth.authenticate("garbage").await,
            Err(ServiceError::Authentication(_))
        ));

        let key = AuthConfig::default();
        let expired = token::issue_token_at(Uuid::new_v4(), 0, 60, key.secret_bytes());
        let err = auth.authenticate(&expired).await.unwrap_err();
        assert_eq!(err.to_string(), "token expired");

        let orphan = token::issue_token(Uuid::new_v4(), 60, key.secret_bytes());
        let err = auth.authenticate(&orphan).await.unwrap_err();
        assert_eq!(err.to_string(), "user no longer exists");
    }
}
