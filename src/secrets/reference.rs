//! Secret reference grammars.
//!
//! Two grammars coexist:
//!
//! - `secret://<engine>?<param>=<value>&...` — user secret reference, e.g.
//!   `secret://vault?s=my-account&k=password`
//! - `encrypted:<engine>!<param>:<value>!...` — external secret reference,
//!   e.g. `encrypted:s3!b:bucket!f:creds.yml`
//!
//! References are parsed on demand each time a field is inspected; only the
//! fact of use is cached (see [`crate::secrets::CredentialsSecretManager`]).
//! Two reference strings that parse to the same engine and parameters are
//! equal.

use crate::secrets::error::SecretError;
use std::collections::BTreeMap;
use url::Url;

/// URI scheme marking a user secret reference
pub const USER_SECRET_SCHEME: &str = "secret";

/// Prefix marking an external (encrypted) secret reference
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

/// Well-known reference parameter names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardSecretParameter {
    /// `k` — data key to extract from the secret payload
    Key,
    /// `e` — payload encoding (`base64` for binary data)
    Encoding,
}

impl StandardSecretParameter {
    pub fn parameter_name(&self) -> &'static str {
        match self {
            Self::Key => "k",
            Self::Encoding => "e",
        }
    }
}

/// Parsed form of a `secret://` user secret reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserSecretReference {
    engine_identifier: String,
    parameters: BTreeMap<String, String>,
}

impl UserSecretReference {
    /// Cheap syntactic check; a `true` result does not guarantee the
    /// reference parses
    pub fn is_user_secret(value: &str) -> bool {
        value.starts_with("secret://")
    }

    /// Parse a user secret reference URI
    pub fn parse(value: &str) -> Result<Self, SecretError> {
        if !Self::is_user_secret(value) {
            return Err(SecretError::InvalidFormat(format!(
                "expected a '{}://' URI, got '{}'",
                USER_SECRET_SCHEME, value
            )));
        }
        let url = Url::parse(value)
            .map_err(|e| SecretError::InvalidFormat(format!("'{}': {}", value, e)))?;
        let engine_identifier = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                SecretError::InvalidFormat(format!("'{}' has no engine identifier", value))
            })?
            .to_string();
        let parameters = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Ok(Self { engine_identifier, parameters })
    }

    /// Parse, returning `None` for strings that are not user secret
    /// references at all (as opposed to malformed ones)
    pub fn try_parse(value: &str) -> Option<Result<Self, SecretError>> {
        Self::is_user_secret(value).then(|| Self::parse(value))
    }

    pub fn engine_identifier(&self) -> &str {
        &self.engine_identifier
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Look up a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Look up a well-known parameter
    pub fn standard_parameter(&self, parameter: StandardSecretParameter) -> Option<&str> {
        self.parameter(parameter.parameter_name())
    }
}

/// Parsed form of an `encrypted:` external secret reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncryptedSecretReference {
    engine_identifier: String,
    parameters: BTreeMap<String, String>,
}

impl EncryptedSecretReference {
    /// Cheap syntactic check; a `true` result does not guarantee the
    /// reference parses
    pub fn is_encrypted_secret(value: &str) -> bool {
        value.starts_with(ENCRYPTED_PREFIX)
    }

    /// Parse an external secret reference.
    ///
    /// The grammar requires at least one parameter pair after the engine
    /// identifier; parameter names match `[a-zA-Z0-9]+` and values may
    /// themselves contain `:`.
    pub fn parse(value: &str) -> Result<Self, SecretError> {
        let rest = value.strip_prefix(ENCRYPTED_PREFIX).ok_or_else(|| {
            SecretError::InvalidFormat(format!("expected an '{}' reference", ENCRYPTED_PREFIX))
        })?;
        let mut segments = rest.split('!');
        let engine_identifier = segments
            .next()
            .filter(|engine| !engine.is_empty())
            .ok_or_else(|| {
                SecretError::InvalidFormat(format!("'{}' has no engine identifier", value))
            })?
            .to_string();
        let mut parameters = BTreeMap::new();
        for segment in segments {
            let (key, parameter_value) = segment.split_once(':').ok_or_else(|| {
                SecretError::InvalidFormat(format!(
                    "'{}': parameters must be '<name>:<value>' pairs",
                    value
                ))
            })?;
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(SecretError::InvalidFormat(format!(
                    "'{}': invalid parameter name '{}'",
                    value, key
                )));
            }
            parameters.insert(key.to_string(), parameter_value.to_string());
        }
        if parameters.is_empty() {
            return Err(SecretError::InvalidFormat(format!(
                "'{}': at least one parameter is required",
                value
            )));
        }
        Ok(Self { engine_identifier, parameters })
    }

    pub fn engine_identifier(&self) -> &str {
        &self.engine_identifier
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}
