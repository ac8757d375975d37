mod account;
mod otp_code;
mod pending_signup;

pub use account::Account;
pub use otp_code::OtpRecord;
pub use pending_signup::PendingSignup;
