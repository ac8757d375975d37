//! Services layer: OTP issuance, notification dispatch, the identity
//! gateway, and the session controller.

mod auth;
mod email;
mod identity;
mod otp;
mod rest;
mod store;

pub use auth::{AuthService, SessionSnapshot};
pub use email::{MockMailer, OtpMailer, SmtpMailer};
pub use identity::{
    AuthState, FederatedCredential, FederatedCredentialSource, IdentityGateway, IdentityProvider,
    ProviderError,
};
pub use otp::{generate_code, InMemoryOtpStore, OtpStore};
pub use rest::RestIdentityProvider;
pub use store::{EphemeralStore, InMemoryStateStore, PENDING_OTP_EMAIL_KEY};
