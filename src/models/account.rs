use serde::{Deserialize, Serialize};

/// Principal issued by the identity provider after a successful
/// authentication or account creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl Account {
    pub fn new(uid: String, email: String, display_name: Option<String>) -> Self {
        Self {
            uid,
            email,
            display_name,
        }
    }
}
