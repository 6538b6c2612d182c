use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SYSTEM_USER: &str = "system";

/// Caller identity handed to every core operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user: String,
    pub issued_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(user: impl Into<String>) -> Self {
        let user = user.into();
        let user = if user.trim().is_empty() {
            SYSTEM_USER.to_string()
        } else {
            user.trim().to_string()
        };
        Self {
            user,
            issued_at: Utc::now(),
        }
    }

    pub fn system() -> Self {
        Self::new(SYSTEM_USER)
    }
}
