//! HTTP implementation of the identity provider boundary against an
//! Identity Toolkit-style REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::config::ProviderConfig;
use crate::models::Account;

use super::identity::{
    AuthState, FederatedCredentialSource, IdentityProvider, ProviderError,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthUriResponse {
    #[serde(default)]
    signin_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Identity provider adapter over HTTP.
///
/// Holds the current session's ID token in memory and publishes session
/// changes through a watch channel. There is no ambient persistence over
/// REST, so the channel starts at `SignedOut`.
pub struct RestIdentityProvider {
    http: Client,
    endpoint: String,
    api_key: String,
    federated: Arc<dyn FederatedCredentialSource>,
    id_token: RwLock<Option<String>>,
    sessions_tx: watch::Sender<AuthState>,
}

impl RestIdentityProvider {
    pub fn new(config: &ProviderConfig, federated: Arc<dyn FederatedCredentialSource>) -> Self {
        let (sessions_tx, _) = watch::channel(AuthState::SignedOut);
        Self {
            http: Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            federated,
            id_token: RwLock::new(None),
            sessions_tx,
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/accounts:{}?key={}", self.endpoint, operation, self.api_key);

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            tracing::error!(error = %e, operation = %operation, "Identity provider request failed");
            ProviderError::new("NETWORK_ERROR", e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            let err = parse_error_body(&err_body);
            tracing::error!(
                status = %status,
                code = %err.code,
                operation = %operation,
                "Identity provider error"
            );
            return Err(err);
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!(error = %e, operation = %operation, "Failed to parse provider response");
            ProviderError::new("MALFORMED_RESPONSE", e.to_string())
        })
    }

    async fn install_session(&self, id_token: String, account: Account) {
        *self.id_token.write().await = Some(id_token);
        self.sessions_tx.send_replace(AuthState::SignedIn(account));
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Account, ProviderError> {
        let created: SignInResponse = self
            .post(
                "signUp",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        // The profile is set in a second call, after the account exists.
        let updated: UpdateResponse = self
            .post(
                "update",
                serde_json::json!({
                    "idToken": created.id_token,
                    "displayName": display_name,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let account = Account::new(
            created.local_id,
            created.email,
            Some(display_name.to_string()),
        );
        let id_token = updated.id_token.unwrap_or(created.id_token);
        self.install_session(id_token, account.clone()).await;
        Ok(account)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, ProviderError> {
        let signed_in: SignInResponse = self
            .post(
                "signInWithPassword",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let account = Account::new(signed_in.local_id, signed_in.email, signed_in.display_name);
        self.install_session(signed_in.id_token, account.clone())
            .await;
        Ok(account)
    }

    async fn authenticate_federated(&self) -> Result<Account, ProviderError> {
        let credential = self.federated.obtain().await?;

        let signed_in: SignInResponse = self
            .post(
                "signInWithIdp",
                serde_json::json!({
                    "postBody": format!(
                        "id_token={}&providerId={}",
                        credential.id_token, credential.provider_id
                    ),
                    "requestUri": "http://localhost",
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let account = Account::new(signed_in.local_id, signed_in.email, signed_in.display_name);
        self.install_session(signed_in.id_token, account.clone())
            .await;
        Ok(account)
    }

    async fn update_credential(&self, new_password: &str) -> Result<(), ProviderError> {
        let id_token = match &*self.id_token.read().await {
            Some(token) => token.clone(),
            None => return Err(ProviderError::new("USER_NOT_SIGNED_IN", "No active session")),
        };

        let updated: UpdateResponse = self
            .post(
                "update",
                serde_json::json!({
                    "idToken": id_token,
                    "password": new_password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        // The provider may rotate the session token on credential change.
        if let Some(new_token) = updated.id_token {
            *self.id_token.write().await = Some(new_token);
        }
        Ok(())
    }

    async fn sign_in_methods(&self, email: &str) -> Result<Vec<String>, ProviderError> {
        let response: AuthUriResponse = self
            .post(
                "createAuthUri",
                serde_json::json!({
                    "identifier": email,
                    "continueUri": "http://localhost",
                }),
            )
            .await?;
        Ok(response.signin_methods)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        *self.id_token.write().await = None;
        self.sessions_tx.send_replace(AuthState::SignedOut);
        Ok(())
    }

    fn watch_session(&self) -> watch::Receiver<AuthState> {
        self.sessions_tx.subscribe()
    }
}

/// Extract the machine code from a provider error payload. Messages arrive
/// either bare (`EMAIL_EXISTS`) or with a trailing explanation
/// (`TOO_MANY_ATTEMPTS_TRY_LATER : ...`).
fn parse_error_body(body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed.error.message;
            let code = message
                .split(':')
                .next()
                .unwrap_or(&message)
                .trim()
                .to_string();
            ProviderError::new(code, message)
        }
        Err(_) => ProviderError::new("UNKNOWN", body.to_string()),
    }
}
