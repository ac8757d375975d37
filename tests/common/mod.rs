//! Test helpers: an in-memory identity provider double plus a controller
//! factory wired with mock collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use auth_client::models::Account;
use auth_client::services::{
    AuthState, IdentityGateway, IdentityProvider, InMemoryOtpStore, InMemoryStateStore,
    MockMailer, OtpMailer, ProviderError,
};
use auth_client::{AuthError, AuthService, SessionSnapshot};

pub struct StoredAccount {
    pub uid: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// In-memory identity provider. Session notifications start at `Unknown`
/// so tests can exercise the bootstrap transition explicitly via
/// [`MockProvider::announce`].
pub struct MockProvider {
    accounts: Mutex<HashMap<String, StoredAccount>>,
    rate_limited: AtomicBool,
    google_account: Mutex<Option<Account>>,
    sessions_tx: watch::Sender<AuthState>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        let (sessions_tx, _) = watch::channel(AuthState::Unknown);
        Self {
            accounts: Mutex::new(HashMap::new()),
            rate_limited: AtomicBool::new(false),
            google_account: Mutex::new(None),
            sessions_tx,
        }
    }

    /// Simulate an ambient session report from the provider.
    pub fn announce(&self, state: AuthState) {
        self.sessions_tx.send_replace(state);
    }

    pub fn seed_account(&self, email: &str, password: &str, display_name: &str) {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            StoredAccount {
                uid: Uuid::new_v4().to_string(),
                password: password.to_string(),
                display_name: Some(display_name.to_string()),
            },
        );
    }

    pub fn set_rate_limited(&self, on: bool) {
        self.rate_limited.store(on, Ordering::SeqCst);
    }

    pub fn set_google_account(&self, account: Account) {
        *self.google_account.lock().unwrap() = Some(account);
    }

    pub fn stored_password(&self, email: &str) -> Option<String> {
        self.accounts
            .lock()
            .unwrap()
            .get(email)
            .map(|a| a.password.clone())
    }

    fn current_account(&self) -> Option<Account> {
        match &*self.sessions_tx.borrow() {
            AuthState::SignedIn(account) => Some(account.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Account, ProviderError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(ProviderError::new("EMAIL_EXISTS", "EMAIL_EXISTS"));
        }

        let uid = Uuid::new_v4().to_string();
        accounts.insert(
            email.to_string(),
            StoredAccount {
                uid: uid.clone(),
                password: password.to_string(),
                display_name: Some(display_name.to_string()),
            },
        );
        drop(accounts);

        let account = Account::new(uid, email.to_string(), Some(display_name.to_string()));
        self.announce(AuthState::SignedIn(account.clone()));
        Ok(account)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, ProviderError> {
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(ProviderError::new(
                "TOO_MANY_ATTEMPTS_TRY_LATER",
                "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled.",
            ));
        }

        let account = {
            let accounts = self.accounts.lock().unwrap();
            let stored = accounts
                .get(email)
                .ok_or_else(|| ProviderError::new("EMAIL_NOT_FOUND", "EMAIL_NOT_FOUND"))?;
            if stored.password != password {
                return Err(ProviderError::new("INVALID_PASSWORD", "INVALID_PASSWORD"));
            }
            Account::new(
                stored.uid.clone(),
                email.to_string(),
                stored.display_name.clone(),
            )
        };

        self.announce(AuthState::SignedIn(account.clone()));
        Ok(account)
    }

    async fn authenticate_federated(&self) -> Result<Account, ProviderError> {
        let account = self
            .google_account
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                ProviderError::new("OPERATION_NOT_ALLOWED", "Google sign-in not configured")
            })?;
        self.announce(AuthState::SignedIn(account.clone()));
        Ok(account)
    }

    async fn update_credential(&self, new_password: &str) -> Result<(), ProviderError> {
        let current = self
            .current_account()
            .ok_or_else(|| ProviderError::new("USER_NOT_SIGNED_IN", "No active session"))?;

        let mut accounts = self.accounts.lock().unwrap();
        match accounts.get_mut(&current.email) {
            Some(stored) => {
                stored.password = new_password.to_string();
                Ok(())
            }
            None => Err(ProviderError::new("EMAIL_NOT_FOUND", "EMAIL_NOT_FOUND")),
        }
    }

    async fn sign_in_methods(&self, email: &str) -> Result<Vec<String>, ProviderError> {
        let registered = self.accounts.lock().unwrap().contains_key(email);
        Ok(if registered {
            vec!["password".to_string()]
        } else {
            Vec::new()
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.announce(AuthState::SignedOut);
        Ok(())
    }

    fn watch_session(&self) -> watch::Receiver<AuthState> {
        self.sessions_tx.subscribe()
    }
}

/// Mailer that always fails, for dispatch-failure paths.
pub struct FailingMailer;

#[async_trait]
impl OtpMailer for FailingMailer {
    async fn send_otp(&self, _to_email: &str, _code: &str) -> Result<(), AuthError> {
        Err(AuthError::Dispatch(
            "smtp relay refused connection".to_string(),
        ))
    }
}

pub struct TestAuth {
    pub service: AuthService,
    pub provider: Arc<MockProvider>,
    pub mailer: Arc<MockMailer>,
    pub otp_store: Arc<InMemoryOtpStore>,
    pub storage: Arc<InMemoryStateStore>,
}

pub fn build_auth() -> TestAuth {
    build_auth_with_ttl(chrono::Duration::minutes(5))
}

pub fn build_auth_with_ttl(ttl: chrono::Duration) -> TestAuth {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init();

    let provider = Arc::new(MockProvider::new());
    let mailer = Arc::new(MockMailer::new());
    let otp_store = Arc::new(InMemoryOtpStore::new());
    let storage = Arc::new(InMemoryStateStore::new());

    let service = AuthService::new(
        IdentityGateway::new(provider.clone()),
        otp_store.clone(),
        mailer.clone(),
        storage.clone(),
        ttl,
    );

    TestAuth {
        service,
        provider,
        mailer,
        otp_store,
        storage,
    }
}

pub fn build_auth_with_failing_mailer() -> (AuthService, Arc<MockProvider>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init();

    let provider = Arc::new(MockProvider::new());
    let service = AuthService::new(
        IdentityGateway::new(provider.clone()),
        Arc::new(InMemoryOtpStore::new()),
        Arc::new(FailingMailer),
        Arc::new(InMemoryStateStore::new()),
        chrono::Duration::minutes(5),
    );
    (service, provider)
}

/// Await the session view satisfying `pred`, with a timeout so a missed
/// notification fails the test instead of hanging it.
pub async fn wait_for_session<F>(service: &AuthService, pred: F) -> SessionSnapshot
where
    F: Fn(&SessionSnapshot) -> bool,
{
    let mut rx = service.subscribe();
    tokio::time::timeout(std::time::Duration::from_secs(2), async move {
        loop {
            {
                let snapshot = rx.borrow_and_update().clone();
                if pred(&snapshot) {
                    return snapshot;
                }
            }
            rx.changed().await.expect("session channel closed");
        }
    })
    .await
    .expect("timed out waiting for session state")
}
