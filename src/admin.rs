//! Request validation for the admin-facing endpoints.
//!
//! Only input checks live here; the privileged operations themselves belong
//! to the identity platform.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClientRegistration {
    pub token: String,
    pub hostname: String,
    pub os: Option<String>,
    pub ip_address: Option<String>,
    pub agent_version: Option<String>,
}

impl RemoteClientRegistration {
    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::InvalidInput("client token cannot be empty".to_string()));
        }
        if self.hostname.trim().is_empty() {
            return Err(AppError::InvalidInput("hostname cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub user_id: String,
    pub new_password: String,
}

impl PasswordResetRequest {
    /// Returns the parsed user id once both fields pass validation.
    pub fn validate(&self) -> AppResult<Uuid> {
        let user_id = Uuid::parse_str(self.user_id.trim())
            .map_err(|_| AppError::InvalidInput("user id must be a UUID".to_string()))?;
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(user_id)
    }
}
