//! Principals and permission evaluation.
//!
//! Authentication itself lives in the embedding service; this crate only
//! consumes an authenticated [`Principal`] and defers access decisions to a
//! pluggable [`PermissionEvaluator`]. A role-based default evaluator is
//! provided for deployments whose access model is fully described by
//! definition `permissions` blocks and secret roles.

use crate::domain::Permissions;
use crate::secrets::UserSecret;
use std::fmt;

/// Permission level requested from a [`PermissionEvaluator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Read,
    Write,
}

impl Authorization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
    admin: bool,
    roles: Vec<String>,
}

impl Principal {
    /// Create a non-admin principal with no roles
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), admin: false, roles: Vec::new() }
    }

    /// Create an administrator principal
    pub fn admin<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), admin: true, roles: Vec::new() }
    }

    /// Builder-style helper to attach roles
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// The object a permission check is evaluated against
#[derive(Debug, Clone, Copy)]
pub enum PermissionTarget<'a> {
    /// An account, by name; used for account-level WRITE checks
    Account(&'a str),
    /// Explicit access-control metadata from a stored definition or live
    /// credentials
    Permissions(&'a Permissions),
    /// A decrypted user secret and its access-control roles
    UserSecret(&'a UserSecret),
}

/// Pluggable access decision point.
///
/// Implementations must be cheap and side-effect free: the service layer
/// consults the evaluator on every mutation and the secret manager re-checks
/// at time of use.
pub trait PermissionEvaluator: Send + Sync {
    fn has_permission(
        &self,
        principal: &Principal,
        target: PermissionTarget<'_>,
        authorization: Authorization,
    ) -> bool;
}

/// Default evaluator driven entirely by principal roles.
///
/// Administrators pass every check. `Permissions` targets grant by role
/// intersection (an empty authorized set restricts that action to admins).
/// `UserSecret` targets with no roles are readable by anyone authenticated.
/// `Account` targets carry no policy of their own here and always pass;
/// deployments with per-account policies supply their own evaluator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RolePermissionEvaluator;

impl PermissionEvaluator for RolePermissionEvaluator {
    fn has_permission(
        &self,
        principal: &Principal,
        target: PermissionTarget<'_>,
        authorization: Authorization,
    ) -> bool {
        if principal.is_admin() {
            return true;
        }
        match target {
            PermissionTarget::Account(_) => true,
            PermissionTarget::Permissions(permissions) => permissions
                .roles_for(authorization)
                .into_iter()
                .any(|role| principal.has_role(role)),
            PermissionTarget::UserSecret(secret) => {
                secret.roles().is_empty()
                    || secret.roles().iter().any(|role| principal.has_role(role))
            }
        }
    }
}
