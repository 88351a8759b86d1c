//! Account store.

use std::{fmt, marker::PhantomData, sync::Arc};

use tokio_util::sync::CancellationToken;

use super::{StoreCore, log_failure, write_result};
use crate::{
    Error, Result,
    association::{
        AssociationKind, AssociationRecord, ClaimAssociation, LoginInfoAssociation,
        RoleMembership, TokenAssociation, UserLoginAssociation, keys,
    },
    backend::DocumentBackend,
    check_cancelled,
    config::StoreOptions,
    identity::{Claim, IdentityResult, LoginInfo, UserAccount, UserLogin, UserToken},
};

/// Persists accounts of type `U` together with their claims, logins, tokens
/// and role memberships.
///
/// Role names are stored exactly as given. Identity frameworks pass normalized
/// names, and lookups must use the same form.
pub struct UserStore<U: UserAccount> {
    pub(super) core: StoreCore,
    _account: PhantomData<fn() -> U>,
}

impl<U: UserAccount> Clone for UserStore<U> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            _account: PhantomData,
        }
    }
}

impl<U: UserAccount> fmt::Debug for UserStore<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStore")
            .field("collection", &U::COLLECTION)
            .field("database", &self.core.uow.database())
            .finish()
    }
}

impl<U: UserAccount> UserStore<U> {
    /// Creates a store over `backend`. Fails if `options` are invalid.
    pub fn new(backend: Arc<dyn DocumentBackend>, options: &StoreOptions) -> Result<Self> {
        Ok(Self {
            core: StoreCore::new(backend, options)?,
            _account: PhantomData,
        })
    }

    /// The database every session of this store opens.
    pub fn database(&self) -> &str {
        self.core.uow.database()
    }

    // === Accounts ===

    pub async fn create(&self, user: &U, cancel: &CancellationToken) -> Result<IdentityResult> {
        check_cancelled(cancel, "create_user")?;
        write_result("create_user", user.id(), self.core.put(user).await)
    }

    pub async fn update(&self, user: &U, cancel: &CancellationToken) -> Result<IdentityResult> {
        check_cancelled(cancel, "update_user")?;
        write_result("update_user", user.id(), self.core.put(user).await)
    }

    /// Deletes the account document. Its association records are left alone.
    pub async fn delete(&self, user: &U, cancel: &CancellationToken) -> Result<IdentityResult> {
        check_cancelled(cancel, "delete_user")?;
        let result = self.core.delete_ids(vec![user.id().to_string()]).await;
        write_result("delete_user", user.id(), result)
    }

    /// Returns `None` when no user has this ID, including when the ID belongs to
    /// a document of another collection.
    pub async fn find_by_id(&self, user_id: &str, cancel: &CancellationToken) -> Result<Option<U>> {
        check_cancelled(cancel, "find_user_by_id")?;
        self.core
            .get::<U>(user_id)
            .await
            .inspect_err(|err| log_failure("find_user_by_id", err))
    }

    pub async fn find_by_name(
        &self,
        normalized_user_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<U>> {
        check_cancelled(cancel, "find_user_by_name")?;
        self.core
            .find_unique::<U>(U::NORMALIZED_NAME_FIELD, normalized_user_name)
            .await
            .inspect_err(|err| log_failure("find_user_by_name", err))
    }

    pub async fn find_by_email(
        &self,
        normalized_email: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<U>> {
        check_cancelled(cancel, "find_user_by_email")?;
        self.core
            .find_unique::<U>(U::NORMALIZED_EMAIL_FIELD, normalized_email)
            .await
            .inspect_err(|err| log_failure("find_user_by_email", err))
    }

    /// Every stored account.
    pub async fn users(&self, cancel: &CancellationToken) -> Result<Vec<U>> {
        check_cancelled(cancel, "list_users")?;
        self.core
            .all::<U>()
            .await
            .inspect_err(|err| log_failure("list_users", err))
    }

    // === Claims ===

    pub async fn get_claims(&self, user: &U, cancel: &CancellationToken) -> Result<Vec<Claim>> {
        check_cancelled(cancel, "get_user_claims")?;
        self.core
            .payloads_referencing::<ClaimAssociation>(user.id())
            .await
            .inspect_err(|err| log_failure("get_user_claims", err))
    }

    /// Attaches each claim to `user`, sharing records with other holders.
    ///
    /// Each claim is its own round trip; a failure leaves earlier claims attached.
    pub async fn add_claims(
        &self,
        user: &U,
        claims: &[Claim],
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "add_user_claims")?;
        let result = async {
            for claim in claims {
                self.core
                    .attach::<ClaimAssociation>(claim.clone(), user.id())
                    .await?;
            }
            Ok::<_, Error>(())
        }
        .await;
        result.inspect_err(|err| log_failure("add_user_claims", err))
    }

    /// Deletes the record of `claim` and attaches `new_claim` to `user`.
    pub async fn replace_claim(
        &self,
        user: &U,
        claim: &Claim,
        new_claim: Claim,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "replace_user_claim")?;
        let result = async {
            self.core.delete_ids(vec![keys::claim_key(claim)]).await?;
            self.core
                .attach::<ClaimAssociation>(new_claim, user.id())
                .await?;
            Ok::<_, Error>(())
        }
        .await;
        result.inspect_err(|err| log_failure("replace_user_claim", err))
    }

    /// Deletes the records of `claims` in one session.
    ///
    /// The whole record goes, so every other user or role sharing one of these
    /// claims loses it too.
    pub async fn remove_claims(
        &self,
        user: &U,
        claims: &[Claim],
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "remove_user_claims")?;
        tracing::debug!(user_id = %user.id(), count = claims.len(), "Removing claim records");
        self.core
            .delete_ids(claims.iter().map(keys::claim_key).collect())
            .await
            .inspect_err(|err| log_failure("remove_user_claims", err))
    }

    /// Accounts holding `claim`.
    pub async fn get_users_for_claim(
        &self,
        claim: &Claim,
        cancel: &CancellationToken,
    ) -> Result<Vec<U>> {
        check_cancelled(cancel, "get_users_for_claim")?;
        let result = async {
            let id = keys::claim_key(claim);
            match self.core.load_record::<ClaimAssociation>(&id).await? {
                Some(record) => self.core.index.load_entities::<U>(record.refs).await,
                None => Ok(Vec::new()),
            }
        }
        .await;
        result.inspect_err(|err| log_failure("get_users_for_claim", err))
    }

    // === Logins ===

    /// Attaches an external login to `user`.
    pub async fn add_login(
        &self,
        user: &U,
        login: LoginInfo,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "add_login")?;
        self.core
            .attach::<LoginInfoAssociation>(login, user.id())
            .await
            .map(|_| ())
            .inspect_err(|err| log_failure("add_login", err))
    }

    /// Deletes the login record for `provider`/`key` along with the owned
    /// login shape of `user`, in one session.
    ///
    /// Like claim removal this drops the whole record, whoever else it lists.
    pub async fn remove_login(
        &self,
        user: &U,
        login_provider: &str,
        provider_key: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "remove_login")?;
        let ids = vec![
            keys::login_info_key(&LoginInfo::new(login_provider, provider_key)),
            keys::owned_login_key(login_provider, provider_key, user.id()),
        ];
        self.core
            .delete_ids(ids)
            .await
            .inspect_err(|err| log_failure("remove_login", err))
    }

    pub async fn get_logins(&self, user: &U, cancel: &CancellationToken) -> Result<Vec<LoginInfo>> {
        check_cancelled(cancel, "get_logins")?;
        self.core
            .payloads_referencing::<LoginInfoAssociation>(user.id())
            .await
            .inspect_err(|err| log_failure("get_logins", err))
    }

    /// The account an external login was added to.
    ///
    /// Resolved in one session: the login record, then its first reference.
    pub async fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<U>> {
        check_cancelled(cancel, "find_user_by_login")?;
        let record_id = keys::login_info_key(&LoginInfo::new(login_provider, provider_key));
        self.core
            .uow
            .run(move |session| {
                Box::pin(async move {
                    let Some(record) = session
                        .load_from::<AssociationRecord<LoginInfo>>(
                            LoginInfoAssociation::COLLECTION,
                            &record_id,
                        )
                        .await?
                    else {
                        return Ok(None);
                    };
                    let Some(owner) = record.refs.first() else {
                        return Ok(None);
                    };
                    if record.refs.len() > 1 {
                        tracing::warn!(
                            id = %record.id,
                            owners = record.refs.len(),
                            "Login attached to several accounts, using the first"
                        );
                    }
                    session.load::<U>(owner).await
                })
            })
            .await
            .inspect_err(|err| log_failure("find_user_by_login", err))
    }

    /// The anonymous login shape for `provider`/`key`, created if absent.
    pub async fn find_user_login(
        &self,
        login_provider: &str,
        provider_key: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLogin> {
        check_cancelled(cancel, "find_user_login")?;
        let candidate = UserLoginAssociation::create(
            UserLogin::anonymous(login_provider, provider_key),
            Vec::<String>::new(),
        );
        self.core
            .ensure
            .run::<UserLoginAssociation>(candidate)
            .await
            .map(|record| record.payload)
            .inspect_err(|err| log_failure("find_user_login", err))
    }

    /// The login shape owned by `user_id` for `provider`/`key`, created if absent.
    pub async fn find_user_login_for(
        &self,
        user_id: &str,
        login_provider: &str,
        provider_key: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLogin> {
        check_cancelled(cancel, "find_user_login_for")?;
        let candidate = UserLoginAssociation::create(
            UserLogin::owned(user_id, login_provider, provider_key),
            [user_id],
        );
        self.core
            .ensure
            .run::<UserLoginAssociation>(candidate)
            .await
            .map(|record| record.payload)
            .inspect_err(|err| log_failure("find_user_login_for", err))
    }

    // === Tokens ===

    /// Stores `token` for its owner unless a token with the same owner,
    /// provider and name already exists.
    pub async fn add_token(&self, token: UserToken, cancel: &CancellationToken) -> Result<()> {
        check_cancelled(cancel, "add_token")?;
        let owner = token.user_id.clone();
        self.core
            .attach::<TokenAssociation>(token, &owner)
            .await
            .map(|_| ())
            .inspect_err(|err| log_failure("add_token", err))
    }

    pub async fn remove_token(
        &self,
        user: &U,
        login_provider: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "remove_token")?;
        self.core
            .delete_ids(vec![keys::token_key(user.id(), login_provider, name)])
            .await
            .inspect_err(|err| log_failure("remove_token", err))
    }

    pub async fn find_token(
        &self,
        user_id: &str,
        login_provider: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<UserToken>> {
        check_cancelled(cancel, "find_token")?;
        self.core
            .load_record::<TokenAssociation>(&keys::token_key(user_id, login_provider, name))
            .await
            .map(|record| record.map(|r| r.payload))
            .inspect_err(|err| log_failure("find_token", err))
    }

    pub async fn get_tokens(&self, user: &U, cancel: &CancellationToken) -> Result<Vec<UserToken>> {
        check_cancelled(cancel, "get_tokens")?;
        self.core
            .payloads_referencing::<TokenAssociation>(user.id())
            .await
            .inspect_err(|err| log_failure("get_tokens", err))
    }

    /// Creates or overwrites the value of a token.
    pub async fn set_token(
        &self,
        user: &U,
        login_provider: &str,
        name: &str,
        value: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "set_token")?;
        let result = async {
            let token = UserToken::new(user.id(), login_provider, name, value.clone());
            let record = self
                .core
                .attach::<TokenAssociation>(token.clone(), user.id())
                .await?;
            if record.payload.value != value {
                self.core
                    .store_record::<TokenAssociation>(record.with_payload(token))
                    .await?;
            }
            Ok::<_, Error>(())
        }
        .await;
        result.inspect_err(|err| log_failure("set_token", err))
    }

    pub async fn get_token_value(
        &self,
        user: &U,
        login_provider: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        Ok(self
            .find_token(user.id(), login_provider, name, cancel)
            .await?
            .and_then(|token| token.value))
    }

    // === Roles ===

    /// Adds `role_name` to the membership record of `user`.
    ///
    /// Ensures the record, then stores it with the role appended. Adding a role
    /// the user already has writes nothing.
    pub async fn add_to_role(
        &self,
        user: &U,
        role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "add_to_role")?;
        let result = async {
            let candidate = RoleMembership::create(user.id().to_string(), Vec::<String>::new());
            let record = self.core.ensure.run::<RoleMembership>(candidate).await?;
            if record.references(role_name) {
                return Ok(());
            }
            self.core
                .store_record::<RoleMembership>(record.add_refs([role_name]))
                .await
        }
        .await;
        result.inspect_err(|err| log_failure("add_to_role", err))
    }

    pub async fn remove_from_role(
        &self,
        user: &U,
        role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "remove_from_role")?;
        let result = async {
            let id = keys::role_membership_key(user.id());
            match self.core.load_record::<RoleMembership>(&id).await? {
                Some(record) if record.references(role_name) => {
                    self.core
                        .store_record::<RoleMembership>(record.remove_refs([role_name]))
                        .await
                }
                _ => Ok(()),
            }
        }
        .await;
        result.inspect_err(|err| log_failure("remove_from_role", err))
    }

    /// Role names of `user`, without duplicates, in the order they were added.
    pub async fn get_roles(&self, user: &U, cancel: &CancellationToken) -> Result<Vec<String>> {
        check_cancelled(cancel, "get_roles")?;
        let id = keys::role_membership_key(user.id());
        let record = self
            .core
            .load_record::<RoleMembership>(&id)
            .await
            .inspect_err(|err| log_failure("get_roles", err))?;
        let mut roles: Vec<String> = Vec::new();
        for role in record.map(|r| r.refs).unwrap_or_default() {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    pub async fn is_in_role(
        &self,
        user: &U,
        role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        check_cancelled(cancel, "is_in_role")?;
        let id = keys::role_membership_key(user.id());
        self.core
            .load_record::<RoleMembership>(&id)
            .await
            .map(|record| record.is_some_and(|r| r.references(role_name)))
            .inspect_err(|err| log_failure("is_in_role", err))
    }

    /// Accounts whose membership record lists `role_name`.
    pub async fn get_users_in_role(
        &self,
        role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<U>> {
        check_cancelled(cancel, "get_users_in_role")?;
        let result = async {
            let owners = self
                .core
                .payloads_referencing::<RoleMembership>(role_name)
                .await?;
            self.core.index.load_entities::<U>(owners).await
        }
        .await;
        result.inspect_err(|err| log_failure("get_users_in_role", err))
    }
}
