//! Identity payloads persisted by the stores.
//!
//! The account and role types are owned by the calling framework; this layer
//! only needs to know their collection, their ID and the JSON fields it queries
//! on. Those requirements are the [`Entity`], [`UserAccount`] and
//! [`RoleEntity`] traits. [`IdentityUser`] and [`IdentityRole`] are the stock
//! implementations.
//!
//! Claims, logins and tokens are plain value types that end up as payloads of
//! association records.

use serde::{Serialize, de::DeserializeOwned};

mod payloads;
mod result;
mod role;
mod user;

pub use payloads::{Claim, LoginInfo, UserLogin, UserToken};
pub use result::{IdentityFault, IdentityResult};
pub use role::IdentityRole;
pub use user::IdentityUser;

/// A document type with a fixed collection and its own ID.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the entity is stored in.
    const COLLECTION: &'static str;

    /// Document ID of this entity.
    fn id(&self) -> &str;
}

/// An account type the user store can persist.
pub trait UserAccount: Entity {
    /// JSON field holding the normalized user name.
    const NORMALIZED_NAME_FIELD: &'static str = "normalized_user_name";

    /// JSON field holding the normalized email.
    const NORMALIZED_EMAIL_FIELD: &'static str = "normalized_email";

    /// Normalized user name, if set.
    fn normalized_user_name(&self) -> Option<&str>;
}

/// A role type the role store can persist.
pub trait RoleEntity: Entity {
    /// JSON field holding the normalized role name.
    const NORMALIZED_NAME_FIELD: &'static str = "normalized_name";

    /// Normalized role name, if set.
    fn normalized_name(&self) -> Option<&str>;
}

/// Default name normalization: upper-case, as the identity framework does.
pub fn normalize(value: &str) -> String {
    value.to_uppercase()
}
