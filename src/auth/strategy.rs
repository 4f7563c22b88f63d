//! Host-side contract between a login host and its social backends.
//!
//! The host owns per-browser session storage and the local user records.
//! Backends only see two narrow seams:
//! - [`SessionStore`]: string key/value storage scoped to one browser session
//! - [`Authenticator`]: the host entry point that turns a provider response into a user
//!
//! In the other direction, every backend exposes itself through [`SocialBackend`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::envelope::ApiResponse;
use crate::error::Result;

/// Session storage for one browser session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    /// Remove a key, returning its previous value.
    fn remove(&self, key: &str) -> Option<String>;
}

/// In-memory [`SessionStore`], one instance per browser session.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: DashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.values.remove(key).map(|(_, v)| v)
    }
}

/// Canonical user details a backend hands to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserDetails {
    /// Look up a detail by its canonical field name.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "username" => Some(self.username.as_str()),
            "email" => Some(self.email.as_str()),
            "fullname" => Some(self.fullname.as_str()),
            "first_name" => Some(self.first_name.as_str()),
            "last_name" => Some(self.last_name.as_str()),
            _ => None,
        }
    }
}

/// What a social backend exposes to the host.
pub trait SocialBackend: Send + Sync {
    /// Backend name, also used in callback URLs.
    fn name(&self) -> &'static str;

    /// Whether the host must validate the email before trusting it.
    fn requires_email_validation(&self) -> bool;

    /// Response field holding the stable external user id.
    fn id_key(&self) -> &'static str;

    /// `(name, alias)` pairs copied into the persisted extra data.
    fn extra_data_fields(&self) -> &'static [(&'static str, &'static str)];

    fn user_details(&self, response: &ApiResponse) -> Result<UserDetails>;

    fn user_id(&self, details: &UserDetails, response: &ApiResponse) -> Result<String>;

    /// Values to persist alongside the social account.
    ///
    /// For each `(name, alias)` the value is taken from the response field
    /// `name`, else the detail `name`, else the detail `alias`. Empty values are
    /// skipped.
    fn extra_data(
        &self,
        response: &ApiResponse,
        details: Option<&UserDetails>,
    ) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        for (name, alias) in self.extra_data_fields() {
            let value = response
                .get(name)
                .or_else(|| details.and_then(|d| d.get(name)))
                .or_else(|| details.and_then(|d| d.get(alias)));
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                data.insert(alias.to_string(), value.to_string());
            }
        }
        data
    }
}

/// Host entry point that locates or creates the local user for a provider response.
#[async_trait]
pub trait Authenticator: Send + Sync {
    type User: Send;

    async fn authenticate(
        &self,
        backend: &dyn SocialBackend,
        response: ApiResponse,
    ) -> Result<Self::User>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_session_store_roundtrip() {
        let store = MemorySessionStore::new();
        assert!(store.get("ymsessionID").is_none());

        store.set("ymsessionID", "abc".to_string());
        assert_eq!(store.get("ymsessionID").as_deref(), Some("abc"));
        assert_eq!(store.len(), 1);

        store.set("ymsessionID", "def".to_string());
        assert_eq!(store.get("ymsessionID").as_deref(), Some("def"));

        assert_eq!(store.remove("ymsessionID").as_deref(), Some("def"));
        assert!(store.is_empty());
        assert!(store.remove("ymsessionID").is_none());
    }

    #[test]
    fn test_user_details_lookup_by_name() {
        let details = UserDetails {
            username: "bob".to_string(),
            email: "b@x.com".to_string(),
            fullname: "LeeBob".to_string(),
            first_name: "Bob".to_string(),
            last_name: "Lee".to_string(),
        };
        assert_eq!(details.get("username"), Some("bob"));
        assert_eq!(details.get("last_name"), Some("Lee"));
        assert_eq!(details.get("user_id"), None);
    }
}
