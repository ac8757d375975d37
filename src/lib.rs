pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AuthConfig;
pub use error::AuthError;
pub use models::Account;
pub use services::{AuthService, SessionSnapshot};
