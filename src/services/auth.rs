//! Session controller orchestrating signup-with-OTP, login, and password
//! reset over the identity gateway, the OTP store, and the mailer.

use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::AuthError;
use crate::models::{Account, PendingSignup};
use crate::utils::require_valid_email;

use super::identity::{AuthState, IdentityGateway};
use super::otp::{generate_code, OtpStore};
use super::store::{EphemeralStore, PENDING_OTP_EMAIL_KEY};
use super::OtpMailer;

/// Read-only session view exposed to the presentation layer.
///
/// `is_loading` stays true until the provider's ambient subscription reports
/// for the first time. `last_error` holds the most recent failure message;
/// it is overwritten by the next failure and never cleared on success - the
/// caller resets it with [`AuthService::clear_error`].
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub account: Option<Account>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            account: None,
            is_loading: true,
            last_error: None,
        }
    }
}

struct SessionWatcher {
    handle: JoinHandle<()>,
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
pub struct AuthService {
    gateway: IdentityGateway,
    otp: Arc<dyn OtpStore>,
    mailer: Arc<dyn OtpMailer>,
    storage: Arc<dyn EphemeralStore>,
    pending: Arc<Mutex<Option<PendingSignup>>>,
    sessions: Arc<watch::Sender<SessionSnapshot>>,
    otp_ttl: chrono::Duration,
    watcher: Arc<SessionWatcher>,
}

impl AuthService {
    /// Build the controller and subscribe to the provider's session
    /// notifications. Must be called from within a tokio runtime; the
    /// subscription task is torn down when the last clone is dropped.
    pub fn new(
        gateway: IdentityGateway,
        otp: Arc<dyn OtpStore>,
        mailer: Arc<dyn OtpMailer>,
        storage: Arc<dyn EphemeralStore>,
        otp_ttl: chrono::Duration,
    ) -> Self {
        let (sessions_tx, _) = watch::channel(SessionSnapshot::default());
        let sessions = Arc::new(sessions_tx);

        let mut rx = gateway.watch_session();
        let task_sessions = sessions.clone();
        let handle = tokio::spawn(async move {
            loop {
                let state = rx.borrow_and_update().clone();
                match state {
                    AuthState::Unknown => {}
                    AuthState::SignedOut => task_sessions.send_modify(|s| {
                        s.account = None;
                        s.is_loading = false;
                    }),
                    AuthState::SignedIn(account) => task_sessions.send_modify(|s| {
                        s.account = Some(account);
                        s.is_loading = false;
                    }),
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });

        Self {
            gateway,
            otp,
            mailer,
            storage,
            pending: Arc::new(Mutex::new(None)),
            sessions,
            otp_ttl,
            watcher: Arc::new(SessionWatcher { handle }),
        }
    }

    /// Current session view.
    pub fn session(&self) -> SessionSnapshot {
        self.sessions.borrow().clone()
    }

    /// Reactive session view; the receiver observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.sessions.subscribe()
    }

    pub fn clear_error(&self) {
        self.sessions.send_modify(|s| s.last_error = None);
    }

    /// Stop applying provider session notifications.
    pub fn shutdown(&self) {
        self.watcher.handle.abort();
    }

    /// Start email/password signup: reject already-registered emails, stage
    /// the credentials, issue a verification code, and dispatch it.
    pub async fn initiate_signup(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(), AuthError> {
        let result = self.start_signup(email, password, display_name).await;
        self.finish("initiate_signup", result)
    }

    async fn start_signup(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(), AuthError> {
        require_valid_email(email)?;

        if self.gateway.has_existing_account(email).await? {
            return Err(AuthError::AccountExists);
        }

        *self.pending.lock().await = Some(PendingSignup::new(
            email.to_string(),
            password.to_string(),
            display_name.to_string(),
        ));

        let code = generate_code();
        self.otp.issue(email, &code, self.otp_ttl).await?;
        self.mailer.send_otp(email, &code).await?;
        self.storage.put(PENDING_OTP_EMAIL_KEY, email).await?;

        tracing::info!(email = %email, "Signup initiated, verification code dispatched");
        Ok(())
    }

    /// Verify the signup code and create the account with the staged
    /// credentials. The code is consumed on success or expiry.
    pub async fn confirm_signup(&self, email: &str, code: &str) -> Result<Account, AuthError> {
        let result = self.complete_signup(email, code).await;
        self.finish("confirm_signup", result)
    }

    async fn complete_signup(&self, email: &str, code: &str) -> Result<Account, AuthError> {
        self.otp.verify(email, code).await?;

        // The staging area is only cleared once account creation succeeds.
        let (staged_email, staged_password, staged_name) = {
            let pending = self.pending.lock().await;
            match &*pending {
                Some(staged) if staged.email == email => (
                    staged.email.clone(),
                    staged.password.expose_secret().clone(),
                    staged.display_name.clone(),
                ),
                Some(_) => {
                    return Err(AuthError::Validation(
                        "No signup in progress for this email".to_string(),
                    ))
                }
                None => {
                    return Err(AuthError::Validation(
                        "Signup process not started".to_string(),
                    ))
                }
            }
        };

        let account = self
            .gateway
            .create_account(&staged_email, &staged_password, &staged_name)
            .await?;

        *self.pending.lock().await = None;
        self.storage.remove(PENDING_OTP_EMAIL_KEY).await?;

        tracing::info!(uid = %account.uid, "Signup confirmed, account created");
        Ok(account)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let result = self.gateway.authenticate(email, password).await;
        self.finish("login", result)
    }

    pub async fn login_with_google(&self) -> Result<Account, AuthError> {
        let result = self.gateway.authenticate_federated().await;
        self.finish("login_with_google", result)
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        let result = self.gateway.sign_out().await;
        self.finish("logout", result)
    }

    /// Issue and dispatch a password-reset code for `email`.
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let result = self.send_reset_code(email).await;
        self.finish("request_reset", result)
    }

    async fn send_reset_code(&self, email: &str) -> Result<(), AuthError> {
        require_valid_email(email)?;

        let code = generate_code();
        self.otp.issue(email, &code, self.otp_ttl).await?;
        self.mailer.send_otp(email, &code).await?;

        tracing::info!(email = %email, "Password reset code dispatched");
        Ok(())
    }

    /// Verify a password-reset code. Consumes the code on success.
    pub async fn confirm_reset(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let result = self.otp.verify(email, code).await;
        self.finish("confirm_reset", result)
    }

    /// Update the credential through the provider. Requires an active
    /// session; a locked-out user cannot complete this step.
    pub async fn apply_reset(&self, new_password: &str) -> Result<(), AuthError> {
        let result = self.gateway.update_credential(new_password).await;
        self.finish("apply_reset", result)
    }

    /// Identifier persisted at signup initiation, if any; lets the host
    /// restore the awaiting-code state after a reload.
    pub async fn pending_otp_email(&self) -> Result<Option<String>, AuthError> {
        Ok(self.storage.get(PENDING_OTP_EMAIL_KEY).await?)
    }

    /// Record a failure into `last_error` and re-raise it, so the immediate
    /// caller can react without inspecting the session.
    fn finish<T>(
        &self,
        operation: &'static str,
        result: Result<T, AuthError>,
    ) -> Result<T, AuthError> {
        if let Err(err) = &result {
            tracing::warn!(operation, error = %err, "Auth operation failed");
            let message = err.to_string();
            self.sessions.send_modify(|s| s.last_error = Some(message));
        }
        result
    }
}
