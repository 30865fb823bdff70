//! Credential definition entity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declarative, serializable description of an account.
///
/// Definitions are immutable by contract: they are constructed by
/// deserialization or via the builder methods, compared structurally on every
/// load cycle, and replaced wholesale on change. The `type` discriminator is a
/// plain field in the wire form; all type-specific fields live in the
/// flattened `spec` map, which is what makes structural equality (and thereby
/// change detection) a derived property rather than per-type code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsDefinition {
    /// Unique key within a credential type
    pub name: String,
    /// Credential type discriminator (e.g. "aws", "kubernetes")
    #[serde(rename = "type")]
    pub type_name: String,
    /// Type-specific fields; string values may hold secret-reference URIs
    #[serde(flatten)]
    pub spec: Map<String, Value>,
}

impl CredentialsDefinition {
    /// Create an empty definition with the given name and type
    pub fn new<N: Into<String>, T: Into<String>>(name: N, type_name: T) -> Self {
        Self { name: name.into(), type_name: type_name.into(), spec: Map::new() }
    }

    /// Builder-style helper to set a spec field
    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.spec.insert(key.into(), value.into());
        self
    }

    /// Get the definition name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the credential type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Look up a spec field by key
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.spec.get(key)
    }

    /// Look up a string-typed spec field by key
    pub fn string_field(&self, key: &str) -> Option<&str> {
        self.spec.get(key).and_then(Value::as_str)
    }

    /// Parse the optional `permissions` block of this definition.
    ///
    /// A definition carrying a well-formed `permissions` block is
    /// access-controlled: mutating it requires WRITE permission evaluated
    /// against the stored value.
    pub fn permissions(&self) -> Option<Permissions> {
        self.spec
            .get("permissions")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Whether this definition declares access-control metadata
    pub fn is_access_controlled(&self) -> bool {
        self.permissions().is_some()
    }
}

/// Access-control metadata embedded in a definition's `permissions` field.
///
/// Roles listed under `write` implicitly hold READ as well. A present but
/// empty authorization list restricts that authorization to administrators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Roles granted READ
    #[serde(default)]
    pub read: Vec<String>,
    /// Roles granted WRITE
    #[serde(default)]
    pub write: Vec<String>,
}

impl Permissions {
    /// Roles granted the given authorization
    pub fn roles_for(&self, authorization: crate::auth::Authorization) -> Vec<&str> {
        match authorization {
            crate::auth::Authorization::Read => {
                self.read.iter().chain(self.write.iter()).map(String::as_str).collect()
            }
            crate::auth::Authorization::Write => self.write.iter().map(String::as_str).collect(),
        }
    }
}
