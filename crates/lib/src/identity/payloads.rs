use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CLAIM_ISSUER, DEFAULT_CLAIM_VALUE_TYPE};

/// A statement about a subject, as issued by some authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
    pub value_type: String,
    pub issuer: String,
    pub original_issuer: String,
}

impl Claim {
    /// A string-valued claim issued by the local authority.
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            value_type: DEFAULT_CLAIM_VALUE_TYPE.to_string(),
            issuer: DEFAULT_CLAIM_ISSUER.to_string(),
            original_issuer: DEFAULT_CLAIM_ISSUER.to_string(),
        }
    }

    pub fn with_value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = value_type.into();
        self
    }

    /// Sets the issuer; the original issuer follows unless set separately.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        self.original_issuer = issuer.clone();
        self.issuer = issuer;
        self
    }

    pub fn with_original_issuer(mut self, original_issuer: impl Into<String>) -> Self {
        self.original_issuer = original_issuer.into();
        self
    }
}

/// An external login, without an owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoginInfo {
    pub login_provider: String,
    pub provider_key: String,
    pub display_name: Option<String>,
}

impl LoginInfo {
    /// Display name defaults to `provider:key`.
    pub fn new(login_provider: impl Into<String>, provider_key: impl Into<String>) -> Self {
        let login_provider = login_provider.into();
        let provider_key = provider_key.into();
        let display_name = Some(format!("{login_provider}:{provider_key}"));
        Self {
            login_provider,
            provider_key,
            display_name,
        }
    }
}

/// An external login bound to an owner.
///
/// `user_id` is `None` for the anonymous shape produced by a lookup that only
/// knows the provider and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserLogin {
    pub login_provider: String,
    pub provider_key: String,
    pub display_name: Option<String>,
    pub user_id: Option<String>,
}

impl UserLogin {
    /// Login shape with no owner.
    pub fn anonymous(login_provider: impl Into<String>, provider_key: impl Into<String>) -> Self {
        let login_provider = login_provider.into();
        let provider_key = provider_key.into();
        let display_name = Some(format!("{login_provider}:{provider_key}"));
        Self {
            login_provider,
            provider_key,
            display_name,
            user_id: None,
        }
    }

    /// Login shape bound to `user_id`.
    pub fn owned(
        user_id: impl Into<String>,
        login_provider: impl Into<String>,
        provider_key: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        let login_provider = login_provider.into();
        let provider_key = provider_key.into();
        let display_name = Some(format!("{login_provider}:{provider_key}:{user_id}"));
        Self {
            login_provider,
            provider_key,
            display_name,
            user_id: Some(user_id),
        }
    }
}

/// An authentication token kept for an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserToken {
    pub user_id: String,
    pub login_provider: String,
    pub name: String,
    pub value: Option<String>,
}

impl UserToken {
    pub fn new(
        user_id: impl Into<String>,
        login_provider: impl Into<String>,
        name: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            login_provider: login_provider.into(),
            name: name.into(),
            value,
        }
    }
}
