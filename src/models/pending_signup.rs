use secrecy::SecretString;

/// Staged signup credentials, held in memory between signup initiation and
/// OTP confirmation. The password never leaves the process and is redacted
/// from `Debug` output. The verification code itself lives in the OTP store,
/// not here.
#[derive(Debug)]
pub struct PendingSignup {
    pub email: String,
    pub password: SecretString,
    pub display_name: String,
}

impl PendingSignup {
    pub fn new(email: String, password: String, display_name: String) -> Self {
        Self {
            email,
            password: SecretString::new(password),
            display_name,
        }
    }
}
