//! Identity provider boundary and the gateway that normalizes its errors.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::error::AuthError;
use crate::models::Account;

/// Raw failure reported by the identity provider: a machine code plus the
/// provider's human-readable message.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Current session as reported by the provider's ambient notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// The provider has not yet reported; session bootstrap in progress.
    Unknown,
    SignedOut,
    SignedIn(Account),
}

/// Credential produced by the provider-hosted interactive sign-in flow.
/// Obtaining it is the host application's job; this crate only exchanges it.
#[derive(Debug, Clone)]
pub struct FederatedCredential {
    pub provider_id: String,
    pub id_token: String,
}

#[async_trait]
pub trait FederatedCredentialSource: Send + Sync {
    async fn obtain(&self) -> Result<FederatedCredential, ProviderError>;
}

/// External identity provider boundary.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Account, ProviderError>;

    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, ProviderError>;

    async fn authenticate_federated(&self) -> Result<Account, ProviderError>;

    /// Requires an active provider session.
    async fn update_credential(&self, new_password: &str) -> Result<(), ProviderError>;

    async fn sign_in_methods(&self, email: &str) -> Result<Vec<String>, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Ambient session notifications, starting from the provider's current
    /// view. Delivered in arrival order for the life of the provider.
    fn watch_session(&self) -> watch::Receiver<AuthState>;
}

/// Thin adapter over the provider that maps its failure codes into the
/// crate's closed error set.
#[derive(Clone)]
pub struct IdentityGateway {
    provider: Arc<dyn IdentityProvider>,
}

impl IdentityGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Account, AuthError> {
        self.provider
            .create_account(email, password, display_name)
            .await
            .map_err(normalize)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        self.provider
            .authenticate(email, password)
            .await
            .map_err(normalize)
    }

    pub async fn authenticate_federated(&self) -> Result<Account, AuthError> {
        self.provider
            .authenticate_federated()
            .await
            .map_err(normalize)
    }

    pub async fn update_credential(&self, new_password: &str) -> Result<(), AuthError> {
        self.provider
            .update_credential(new_password)
            .await
            .map_err(normalize)
    }

    pub async fn has_existing_account(&self, email: &str) -> Result<bool, AuthError> {
        let methods = self
            .provider
            .sign_in_methods(email)
            .await
            .map_err(normalize)?;
        Ok(!methods.is_empty())
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await.map_err(normalize)
    }

    pub fn watch_session(&self) -> watch::Receiver<AuthState> {
        self.provider.watch_session()
    }
}

/// Exhaustive mapping from provider failure codes to the domain error set,
/// defaulting to `AuthenticationFailed` with the provider message preserved.
fn normalize(err: ProviderError) -> AuthError {
    match err.code.as_str() {
        "EMAIL_EXISTS" => AuthError::AccountExists,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" => {
            AuthError::InvalidCredentials
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::RateLimited,
        "INVALID_ID_TOKEN" | "USER_NOT_SIGNED_IN" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
            AuthError::NotAuthenticated
        }
        "INVALID_EMAIL" => AuthError::Validation("Invalid email address".to_string()),
        "WEAK_PASSWORD" => AuthError::Validation("Password too weak".to_string()),
        "USER_DISABLED" => AuthError::AuthenticationFailed(anyhow::anyhow!("Account disabled")),
        "OPERATION_NOT_ALLOWED" => {
            AuthError::AuthenticationFailed(anyhow::anyhow!("Operation not allowed"))
        }
        _ => AuthError::AuthenticationFailed(anyhow::anyhow!(err.message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(code: &str) -> AuthError {
        normalize(ProviderError::new(code, "provider message"))
    }

    #[test]
    fn credential_failures_collapse_to_invalid_credentials() {
        for code in ["INVALID_LOGIN_CREDENTIALS", "INVALID_PASSWORD", "EMAIL_NOT_FOUND"] {
            assert!(matches!(normalized(code), AuthError::InvalidCredentials));
        }
    }

    #[test]
    fn lockout_maps_to_rate_limited() {
        assert!(matches!(
            normalized("TOO_MANY_ATTEMPTS_TRY_LATER"),
            AuthError::RateLimited
        ));
    }

    #[test]
    fn duplicate_email_maps_to_account_exists() {
        assert!(matches!(normalized("EMAIL_EXISTS"), AuthError::AccountExists));
    }

    #[test]
    fn missing_session_maps_to_not_authenticated() {
        for code in ["INVALID_ID_TOKEN", "USER_NOT_SIGNED_IN"] {
            assert!(matches!(normalized(code), AuthError::NotAuthenticated));
        }
    }

    #[test]
    fn unmapped_codes_fall_back_and_keep_the_message() {
        let err = normalized("SOMETHING_NEW");
        match err {
            AuthError::AuthenticationFailed(inner) => {
                assert_eq!(inner.to_string(), "provider message");
            }
            other => panic!("expected AuthenticationFailed, got {:?}", other),
        }
    }
}
