//! Secret value types.

use crate::secrets::error::SecretError;
use std::collections::HashMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Conventional data key used when a reference does not name one
pub const DEFAULT_DATA_KEY: &str = "value";

/// A string holding secret material.
///
/// The inner value is zeroed on drop and never appears in `Debug` output.
/// There is intentionally no `Display` implementation; call sites must opt in
/// via [`SecretString::expose`].
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// Access the secret material
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A decrypted user secret: named data keys plus the roles allowed to read it.
///
/// Engines return the whole secret payload; callers extract individual data
/// keys. The roles are access-control metadata evaluated by a
/// [`crate::auth::PermissionEvaluator`] — an empty list means the secret is
/// readable by any authenticated principal.
#[derive(Debug, Clone)]
pub struct UserSecret {
    data: HashMap<String, SecretString>,
    roles: Vec<String>,
}

impl UserSecret {
    pub fn new(data: HashMap<String, SecretString>, roles: Vec<String>) -> Self {
        Self { data, roles }
    }

    /// Convenience constructor for a single-valued secret under the
    /// [`DEFAULT_DATA_KEY`]
    pub fn single<S: Into<String>>(value: S) -> Self {
        Self {
            data: HashMap::from([(DEFAULT_DATA_KEY.to_string(), SecretString::new(value))]),
            roles: Vec::new(),
        }
    }

    /// Builder-style helper to attach reader roles
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Roles allowed to read this secret
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Extract a data key.
    ///
    /// A missing key is a decryption-class failure, distinct from the secret
    /// itself not being found.
    pub fn secret_string(&self, key: &str) -> Result<SecretString, SecretError> {
        self.data
            .get(key)
            .cloned()
            .ok_or_else(|| SecretError::MissingDataKey { key: key.to_string() })
    }

    /// Data keys present in this secret
    pub fn data_keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}
