use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub job: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// For registering users (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub job: Option<String>,
}

impl NewUser {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            phone: None,
            address: None,
            job: None,
        }
    }
}
