use thiserror::Error;

/// Errors surfaced by the authentication core.
///
/// Provider-specific failure codes are normalized into this closed set by the
/// identity gateway; anything unmapped lands in `AuthenticationFailed` with
/// the provider's message preserved. The `Display` strings double as the
/// user-facing messages recorded in the session's `last_error`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Email is already registered. Try logging in.")]
    AccountExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Too many attempts. Try again later")]
    RateLimited,

    #[error("You must be signed in to do that")]
    NotAuthenticated,

    #[error("No verification code found for this email")]
    OtpNotFound,

    #[error("Verification code has expired")]
    OtpExpired,

    #[error("Invalid verification code")]
    OtpMismatch,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(anyhow::Error),

    #[error("Failed to send verification email: {0}")]
    Dispatch(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),
}

impl From<lettre::error::Error> for AuthError {
    fn from(err: lettre::error::Error) -> Self {
        AuthError::Dispatch(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for AuthError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        AuthError::Dispatch(err.to_string())
    }
}
