use serde::Deserialize;
use std::env;

use crate::error::AuthError;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub provider: ProviderConfig,
    pub smtp: SmtpConfig,
    pub otp: OtpConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

/// Identity Toolkit-style REST endpoint the provider adapter talks to.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub user: String,
    pub app_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    pub ttl_seconds: i64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AuthError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("auth-client"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            provider: ProviderConfig {
                endpoint: get_env(
                    "IDENTITY_ENDPOINT",
                    Some("https://identitytoolkit.googleapis.com/v1"),
                    is_prod,
                )?,
                api_key: get_env("IDENTITY_API_KEY", None, is_prod)?,
            },
            smtp: SmtpConfig {
                user: get_env("GMAIL_USER", None, is_prod)?,
                app_password: get_env("GMAIL_APP_PASSWORD", None, is_prod)?,
            },
            otp: OtpConfig {
                ttl_seconds: get_env("OTP_TTL_SECONDS", Some("300"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AuthError::Config(anyhow::anyhow!(e.to_string()))
                    })?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.otp.ttl_seconds <= 0 {
            return Err(AuthError::Config(anyhow::anyhow!(
                "OTP_TTL_SECONDS must be positive"
            )));
        }

        if self.environment == Environment::Prod && !self.provider.endpoint.starts_with("https://")
        {
            return Err(AuthError::Config(anyhow::anyhow!(
                "IDENTITY_ENDPOINT must use https in production"
            )));
        }

        Ok(())
    }

    pub fn otp_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.otp.ttl_seconds)
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AuthError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AuthError::Config(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AuthError::Config(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
