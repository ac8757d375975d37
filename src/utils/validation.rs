use validator::ValidateEmail;

use crate::error::AuthError;

pub fn require_valid_email(email: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::Validation("Email is required".to_string()));
    }
    if !email.validate_email() {
        return Err(AuthError::Validation("Invalid email address".to_string()));
    }
    Ok(())
}
