// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use serde_json::Value;

/// A client the session holds an authenticated client session for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DelegatedClient {
    /// Internal, stable identifier of the client.
    pub id: String,
    /// OAuth `client_id`.
    pub client_id: String,
}

impl DelegatedClient {
    pub fn new(id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
        }
    }
}

/// The narrow view of a token-issuance session the mapper works against. Implemented by the host
/// identity provider.
///
/// Attribute writes go through `&self` so that several mappers can share one session.
pub trait SessionContext: Send + Sync {
    /// Stable identifier of the authenticated principal.
    fn principal_id(&self) -> &str;

    /// The name the principal logged in with.
    fn login_username(&self) -> &str;

    /// Every client the session has an authenticated client session for, in discovery order.
    fn delegated_clients(&self) -> Vec<DelegatedClient>;

    /// First value of the named incoming request header. Lookup is case-insensitive.
    fn header(&self, name: &str) -> Option<String>;

    fn attribute(&self, key: &str) -> Option<Value>;

    fn set_attribute(&self, key: &str, value: Value);
}

/// A self-contained [`SessionContext`] for hosts that assemble session state up front.
#[derive(Debug, Default)]
pub struct MemorySession {
    principal_id: String,
    login_username: String,
    clients: Vec<DelegatedClient>,
    headers: Vec<(String, String)>,
    attributes: RwLock<HashMap<String, Value>>,
}

impl MemorySession {
    pub fn new(principal_id: impl Into<String>, login_username: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            login_username: login_username.into(),
            ..Default::default()
        }
    }

    pub fn with_client(mut self, client: DelegatedClient) -> Self {
        self.clients.push(client);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn clear_attribute(&self, key: &str) {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

impl SessionContext for MemorySession {
    fn principal_id(&self) -> &str {
        &self.principal_id
    }

    fn login_username(&self) -> &str {
        &self.login_username
    }

    fn delegated_clients(&self) -> Vec<DelegatedClient> {
        self.clients.clone()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn attribute(&self, key: &str) -> Option<Value> {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_attribute(&self, key: &str, value: Value) {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let session = MemorySession::new("uid", "alice")
            .with_header("X-VirtruPubKey", "first")
            .with_header("x-virtrupubkey", "second");
        assert_eq!(session.header("x-VIRTRUpubkey").as_deref(), Some("first"));
        assert_eq!(session.header("Authorization"), None);
    }

    #[test]
    fn test_attributes() {
        let session = MemorySession::new("uid", "alice");
        assert_eq!(session.attribute("k"), None);
        session.set_attribute("k", json!({"a": 1}));
        assert_eq!(session.attribute("k"), Some(json!({"a": 1})));
        session.clear_attribute("k");
        assert_eq!(session.attribute("k"), None);
    }
}
