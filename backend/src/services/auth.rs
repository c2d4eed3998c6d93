//! Registration and login
//!
//! Both flows are a straight line of awaited calls: store lookup, password
//! hash or verify (on the blocking pool), store insert, token issue. Any
//! infrastructure failure along the way is collapsed into a per-operation
//! message ("Registration failed" / "Login failed") before it leaves here.

use crate::auth::{PasswordService, TokenIssuer};
use crate::error::ApiError;
use crate::repositories::{CreateUserError, NewUser, UserStore};
use crate::state::AppState;
use account_auth_shared::validation::normalize_email;
use account_auth_shared::{LoginRequest, RegisterRequest, TokenResponse, UserProfile};
use tracing::{info, warn};
use uuid::Uuid;

pub const USER_EXISTS: &str = "User already exists";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_PASSWORD: &str = "Invalid password";
pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const LOGIN_FAILED: &str = "Login failed";

/// Auth flows over a credential store, a password hasher and a token issuer
pub struct AuthService<'a> {
    store: &'a dyn UserStore,
    passwords: &'a PasswordService,
    tokens: &'a TokenIssuer,
    uniform_login_errors: bool,
}

impl<'a> AuthService<'a> {
    pub fn new(
        store: &'a dyn UserStore,
        passwords: &'a PasswordService,
        tokens: &'a TokenIssuer,
        uniform_login_errors: bool,
    ) -> Self {
        Self {
            store,
            passwords,
            tokens,
            uniform_login_errors,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.store(),
            state.passwords(),
            state.tokens(),
            state.config().auth.uniform_login_errors,
        )
    }

    /// Register a new user and issue their first token
    pub async fn register(&self, req: RegisterRequest) -> Result<TokenResponse, ApiError> {
        let result = self
            .try_register(req)
            .await
            .map_err(|e| e.masked(REGISTRATION_FAILED));
        record_outcome("auth_register_total", &result);
        result
    }

    async fn try_register(&self, req: RegisterRequest) -> Result<TokenResponse, ApiError> {
        let email = normalize_email(&req.email);

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict(USER_EXISTS.to_string()));
        }

        let password_hash = self.passwords.hash_async(req.password).await?;

        let new_user = NewUser {
            name: req.name.trim().to_string(),
            email,
            password_hash,
        };
        let user = match self.store.create(new_user).await {
            Ok(user) => user,
            // Lost a race with a concurrent registration for the same email
            Err(CreateUserError::DuplicateEmail(_)) => {
                return Err(ApiError::Conflict(USER_EXISTS.to_string()))
            }
            Err(CreateUserError::Store(e)) => return Err(ApiError::Internal(e)),
        };

        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "User registered");

        Ok(TokenResponse { token })
    }

    /// Check credentials and issue a token
    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse, ApiError> {
        let result = self
            .try_login(req)
            .await
            .map_err(|e| e.masked(LOGIN_FAILED));
        record_outcome("auth_login_total", &result);
        result
    }

    async fn try_login(&self, req: LoginRequest) -> Result<TokenResponse, ApiError> {
        let email = normalize_email(&req.email);

        let Some(user) = self.store.find_by_email(&email).await? else {
            if self.uniform_login_errors {
                // Spend one hash worth of work so an unknown email is not
                // answered faster than a wrong password.
                let _ = self.passwords.hash_async(req.password).await;
            }
            warn!("Login rejected: unknown email");
            return Err(self.unknown_email_error());
        };

        let valid = PasswordService::verify_async(req.password, user.password_hash).await?;
        if !valid {
            warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(self.wrong_password_error());
        }

        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "User logged in");

        Ok(TokenResponse { token })
    }

    /// Profile of an authenticated user
    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, ApiError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(UserProfile {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        })
    }

    fn unknown_email_error(&self) -> ApiError {
        if self.uniform_login_errors {
            ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())
        } else {
            ApiError::BadRequest(INVALID_CREDENTIALS.to_string())
        }
    }

    fn wrong_password_error(&self) -> ApiError {
        if self.uniform_login_errors {
            ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())
        } else {
            ApiError::Unauthorized(INVALID_PASSWORD.to_string())
        }
    }
}

fn record_outcome<T>(counter: &'static str, result: &Result<T, ApiError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(ApiError::Conflict(_)) => "conflict",
        Err(ApiError::Unauthorized(_) | ApiError::BadRequest(_)) => "rejected",
        Err(_) => "error",
    };
    metrics::counter!(counter, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordAlgorithm;
    use crate::repositories::{InMemoryUserStore, UserRecord};
    use anyhow::Result;
    use async_trait::async_trait;
    use secrecy::SecretString;

    struct Fixture {
        store: InMemoryUserStore,
        passwords: PasswordService,
        tokens: TokenIssuer,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: InMemoryUserStore::new(),
                passwords: PasswordService::new(PasswordAlgorithm::Bcrypt, 4),
                tokens: TokenIssuer::new(&SecretString::new("test-secret".to_string()), 604_800),
            }
        }

        fn service(&self, uniform_login_errors: bool) -> AuthService<'_> {
            AuthService::new(
                &self.store,
                &self.passwords,
                &self.tokens,
                uniform_login_errors,
            )
        }
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    /// Store whose every call fails, standing in for an unreachable database
    struct UnreachableStore;

    #[async_trait]
    impl UserStore for UnreachableStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<UserRecord>> {
            Err(anyhow::anyhow!("connection refused"))
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<UserRecord>> {
            Err(anyhow::anyhow!("connection refused"))
        }

        async fn create(&self, _user: NewUser) -> Result<UserRecord, CreateUserError> {
            Err(anyhow::anyhow!("connection refused").into())
        }

        async fn health_check(&self) -> Result<()> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_register_issues_token_for_new_user() {
        let fx = Fixture::new();
        let response = fx
            .service(true)
            .register(register_req("ada@example.com", "analytical engine"))
            .await
            .unwrap();

        let claims = fx.tokens.validate(&response.token).unwrap();
        let user = fx.store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(user.name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_stored_hash_is_not_the_password() {
        let fx = Fixture::new();
        fx.service(true)
            .register(register_req("ada@example.com", "analytical engine"))
            .await
            .unwrap();

        let user = fx.store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_ne!(user.password_hash, "analytical engine");
        assert!(PasswordService::verify("analytical engine", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let fx = Fixture::new();
        let service = fx.service(true);
        service
            .register(register_req("ada@example.com", "analytical engine"))
            .await
            .unwrap();

        let err = service
            .register(register_req("ADA@example.com ", "another password"))
            .await
            .unwrap_err();

        assert!(matches!(&err, ApiError::Conflict(msg) if msg == USER_EXISTS));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(fx.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_login_with_correct_credentials() {
        let fx = Fixture::new();
        let service = fx.service(true);
        service
            .register(register_req("ada@example.com", "analytical engine"))
            .await
            .unwrap();

        let response = service
            .login(login_req("Ada@Example.com", "analytical engine"))
            .await
            .unwrap();

        let user = fx.store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(fx.tokens.validate(&response.token).unwrap().sub, user.id.to_string());
    }

    #[tokio::test]
    async fn test_uniform_login_errors() {
        let fx = Fixture::new();
        let service = fx.service(true);
        service
            .register(register_req("ada@example.com", "analytical engine"))
            .await
            .unwrap();

        let wrong_password = service
            .login(login_req("ada@example.com", "difference engine"))
            .await
            .unwrap_err();
        let unknown_email = service
            .login(login_req("babbage@example.com", "difference engine"))
            .await
            .unwrap_err();

        assert!(matches!(&wrong_password, ApiError::Unauthorized(msg) if msg == INVALID_CREDENTIALS));
        assert!(matches!(&unknown_email, ApiError::Unauthorized(msg) if msg == INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_unknown_email_costs_a_password_hash() {
        let fx = Fixture {
            passwords: PasswordService::new(PasswordAlgorithm::Bcrypt, 10),
            ..Fixture::new()
        };

        let started = std::time::Instant::now();
        fx.passwords.hash("difference engine").unwrap();
        let one_hash = started.elapsed();

        let started = std::time::Instant::now();
        let err = fx
            .service(true)
            .login(login_req("babbage@example.com", "difference engine"))
            .await
            .unwrap_err();
        let unknown_email = started.elapsed();

        assert!(matches!(&err, ApiError::Unauthorized(msg) if msg == INVALID_CREDENTIALS));
        assert!(unknown_email >= one_hash / 4);
    }

    #[tokio::test]
    async fn test_legacy_login_errors() {
        let fx = Fixture::new();
        let service = fx.service(false);
        service
            .register(register_req("ada@example.com", "analytical engine"))
            .await
            .unwrap();

        let wrong_password = service
            .login(login_req("ada@example.com", "difference engine"))
            .await
            .unwrap_err();
        let unknown_email = service
            .login(login_req("babbage@example.com", "difference engine"))
            .await
            .unwrap_err();

        assert!(matches!(&wrong_password, ApiError::Unauthorized(msg) if msg == INVALID_PASSWORD));
        assert!(matches!(&unknown_email, ApiError::BadRequest(msg) if msg == INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_store_failure_is_masked_on_register() {
        let fx = Fixture::new();
        let service = AuthService::new(&UnreachableStore, &fx.passwords, &fx.tokens, true);

        let err = service
            .register(register_req("ada@example.com", "analytical engine"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::OperationFailed { message, .. } if message == REGISTRATION_FAILED));
    }

    #[tokio::test]
    async fn test_store_failure_is_masked_on_login() {
        let fx = Fixture::new();
        let service = AuthService::new(&UnreachableStore, &fx.passwords, &fx.tokens, true);

        let err = service
            .login(login_req("ada@example.com", "analytical engine"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::OperationFailed { message, .. } if message == LOGIN_FAILED));
    }

    #[tokio::test]
    async fn test_corrupt_stored_hash_is_a_login_failure() {
        let fx = Fixture::new();
        fx.store
            .create(NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "not-a-hash".to_string(),
            })
            .await
            .unwrap();

        let err = fx
            .service(true)
            .login(login_req("ada@example.com", "analytical engine"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::OperationFailed { message, .. } if message == LOGIN_FAILED));
    }

    #[rstest::rstest]
    #[case("$argon2id$garbage")]
    #[case("$argon2id$v=19$m=1,t=2,p=1$c2FsdHNhbHRzYWx0$aGFzaGhhc2hoYXNoaGFzaGhhc2g")]
    #[tokio::test]
    async fn test_corrupt_argon2_hash_is_a_login_failure(#[case] stored_hash: &str) {
        let fx = Fixture::new();
        fx.store
            .create(NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: stored_hash.to_string(),
            })
            .await
            .unwrap();

        let err = fx
            .service(true)
            .login(login_req("ada@example.com", "analytical engine"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, ApiError::OperationFailed { message, .. } if message == LOGIN_FAILED));
    }

    #[tokio::test]
    async fn test_profile_of_registered_user() {
        let fx = Fixture::new();
        let service = fx.service(true);
        let token = service
            .register(register_req("ada@example.com", "analytical engine"))
            .await
            .unwrap()
            .token;
        let user_id = fx.tokens.validate(&token).unwrap().user_id().unwrap();

        let profile = service.profile(user_id).await.unwrap();
        assert_eq!(profile.id, user_id);
        assert_eq!(profile.email, "ada@example.com");

        let missing = service.profile(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(_)));
    }
}
