use async_trait::async_trait;

/// Key under which the identifier awaiting OTP confirmation is persisted, so
/// the host can restore the "awaiting code" state after a reload.
pub const PENDING_OTP_EMAIL_KEY: &str = "pending_otp_email";

/// Session-scoped key/value storage (the browser-tab storage of the original
/// deployment). Entries live at most as long as the host session.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    async fn put(&self, key: &str, value: &str) -> Result<(), anyhow::Error>;
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;
    async fn remove(&self, key: &str) -> Result<(), anyhow::Error>;
}

#[derive(Default)]
pub struct InMemoryStateStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EphemeralStore for InMemoryStateStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("State store mutex poisoned: {}", e))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let val = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("State store mutex poisoned: {}", e))?
            .get(key)
            .cloned();
        Ok(val)
    }

    async fn remove(&self, key: &str) -> Result<(), anyhow::Error> {
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("State store mutex poisoned: {}", e))?
            .remove(key);
        Ok(())
    }
}
