use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, UserAccount, normalize};
use crate::constants::USERS;

/// The stock account type.
///
/// Field names double as the JSON fields queried by the user store, see
/// [`UserAccount`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    pub user_name: Option<String>,
    pub normalized_user_name: Option<String>,
    pub email: Option<String>,
    pub normalized_email: Option<String>,
    pub email_confirmed: bool,
    pub password_hash: Option<String>,
    pub security_stamp: Option<String>,
    pub concurrency_stamp: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_confirmed: bool,
    pub two_factor_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub lockout_enabled: bool,
    pub access_failed_count: u32,
}

impl Default for IdentityUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_name: None,
            normalized_user_name: None,
            email: None,
            normalized_email: None,
            email_confirmed: false,
            password_hash: None,
            security_stamp: None,
            concurrency_stamp: Some(Uuid::new_v4().to_string()),
            phone_number: None,
            phone_number_confirmed: false,
            two_factor_enabled: false,
            lockout_end: None,
            lockout_enabled: false,
            access_failed_count: 0,
        }
    }
}

impl IdentityUser {
    /// A new account with a fresh ID and a normalized user name.
    pub fn new(user_name: impl Into<String>) -> Self {
        let user_name = user_name.into();
        Self {
            normalized_user_name: Some(normalize(&user_name)),
            user_name: Some(user_name),
            ..Self::default()
        }
    }

    /// Sets the email and its normalized form.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.normalized_email = Some(normalize(&email));
        self.email = Some(email);
        self
    }
}

impl Entity for IdentityUser {
    const COLLECTION: &'static str = USERS;

    fn id(&self) -> &str {
        &self.id
    }
}

impl UserAccount for IdentityUser {
    fn normalized_user_name(&self) -> Option<&str> {
        self.normalized_user_name.as_deref()
    }
}

impl std::fmt::Display for IdentityUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.user_name.as_deref().unwrap_or(&self.id))
    }
}
