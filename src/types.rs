//! Core identifier and credential types.

use std::fmt;

/// NodeId: identifier assigned by the collection store to a folder or request
pub type NodeId = String;

/// CollectionId: identifier (or uid) of a collection in the store
pub type CollectionId = String;

/// Credential passed explicitly to every collaborator call
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Credentials for both collaborators, resolved once per process
#[derive(Debug, Clone)]
pub struct Credentials {
    pub store: ApiKey,
    pub generator: ApiKey,
}
