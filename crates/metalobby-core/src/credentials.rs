//! Account lookup for registered logins.
//!
//! The lobby only ever asks three questions of its account database, so the
//! seam is a small trait. [`MemoryCredentialStore`] is the built-in
//! implementation, populated from the command line or by tests.

use std::collections::HashMap;

use crate::session::Permissions;

/// Read-only view of the account database.
///
/// Implementations must be safe to call from many sessions at once.
pub trait CredentialStore: Send + Sync + 'static {
    /// True if `name` belongs to a registered account.
    fn contains_name(&self, name: &str) -> bool;

    /// True if `password` is correct for `name`. False for unknown names.
    fn password_correct(&self, name: &str, password: &str) -> bool;

    /// Permission level of `name`. `Regular` for unknown names.
    fn permissions(&self, name: &str) -> Permissions;
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    permissions: Permissions,
}

/// In-memory account table.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    accounts: HashMap<String, Account>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account, replacing any existing one with the same name.
    pub fn with_account(
        mut self,
        name: impl Into<String>,
        password: impl Into<String>,
        permissions: Permissions,
    ) -> Self {
        self.insert(name, password, permissions);
        self
    }

    /// Add an account in place.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        password: impl Into<String>,
        permissions: Permissions,
    ) {
        self.accounts
            .insert(name.into(), Account { password: password.into(), permissions });
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn contains_name(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    fn password_correct(&self, name: &str, password: &str) -> bool {
        self.accounts.get(name).is_some_and(|account| account.password == password)
    }

    fn permissions(&self, name: &str) -> Permissions {
        self.accounts.get(name).map_or(Permissions::Regular, |account| account.permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryCredentialStore {
        MemoryCredentialStore::new()
            .with_account("root", "hunter2", Permissions::Superuser)
            .with_account("bob", "secret", Permissions::Regular)
    }

    #[test]
    fn lookups() {
        let store = store();

        assert_eq!(store.len(), 2);
        assert!(store.contains_name("root"));
        assert!(!store.contains_name("Root"));
        assert!(store.password_correct("root", "hunter2"));
        assert!(!store.password_correct("root", "secret"));
        assert_eq!(store.permissions("root"), Permissions::Superuser);
        assert_eq!(store.permissions("bob"), Permissions::Regular);
    }

    #[test]
    fn unknown_names_are_never_authenticated() {
        let store = store();
        assert!(!store.password_correct("mallory", ""));
        assert_eq!(store.permissions("mallory"), Permissions::Regular);
    }

    #[test]
    fn insert_replaces_existing_account() {
        let mut store = store();
        store.insert("bob", "changed", Permissions::Superuser);

        assert_eq!(store.len(), 2);
        assert!(!store.password_correct("bob", "secret"));
        assert!(store.password_correct("bob", "changed"));
        assert_eq!(store.permissions("bob"), Permissions::Superuser);
    }
}
