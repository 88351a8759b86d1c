//! Constants used throughout docident.
//!
//! Collection names, key namespaces and option defaults live here so every
//! backend sees the same document layout.

/// Separator between the fields of a derived key.
pub const KEY_SEPARATOR: &str = "/";

/// Namespace prefix of role-membership keys.
pub const ROLE_MEMBERSHIP_PREFIX: &str = "RoleMembership";

/// Namespace prefix of login-info keys.
///
/// Keeps them apart from anonymous user-login keys, which share the
/// `provider/key` shape and the per-database ID namespace.
pub const LOGIN_INFO_PREFIX: &str = "logins";

/// Namespace prefix of token keys.
pub const TOKEN_PREFIX: &str = "tokens";

/// Collection holding claim associations (shared by user and role claims).
pub const CLAIM_ASSOCIATIONS: &str = "ClaimAssociations";

/// Collection holding anonymous login associations written by `add_login`.
pub const LOGIN_INFO_ASSOCIATIONS: &str = "LoginInfoAssociations";

/// Collection holding owned login associations.
pub const USER_LOGIN_ASSOCIATIONS: &str = "UserLoginAssociations";

/// Collection holding token associations.
pub const TOKEN_ASSOCIATIONS: &str = "TokenAssociations";

/// Collection holding role-membership records.
pub const ROLE_MEMBERSHIPS: &str = "RoleMemberships";

/// Collection holding `IdentityUser` documents.
pub const USERS: &str = "Users";

/// Collection holding `IdentityRole` documents.
pub const ROLES: &str = "Roles";

/// Default logical database name.
pub const DEFAULT_DATABASE_NAME: &str = "Identity";

/// Default bound on ensure-or-create create+reload cycles.
pub const DEFAULT_MAX_ENSURE_ATTEMPTS: usize = 3;

/// Claim value type used when none is given.
pub const DEFAULT_CLAIM_VALUE_TYPE: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Claim issuer used when none is given.
pub const DEFAULT_CLAIM_ISSUER: &str = "LOCAL AUTHORITY";
