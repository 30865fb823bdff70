//! Live credentials contract.

use crate::domain::Permissions;

/// Live, usable counterpart of a [`crate::domain::CredentialsDefinition`],
/// produced by a [`crate::loader::CredentialsParser`].
///
/// Concrete credentials types are supplied by the embedding service (they
/// typically hold decrypted secret values or constructed SDK clients). Once
/// parsed, a credentials object is owned by the repository cache: it is
/// replaced on update and dropped on removal, never mutated in place.
pub trait Credentials: Send + Sync + 'static {
    /// Account name, unique within a credential type
    fn name(&self) -> &str;

    /// Credential type discriminator
    fn type_name(&self) -> &str;

    /// Access-control metadata carried by the live credentials, if any.
    ///
    /// Returning `Some` marks these credentials as access-controlled: the
    /// service layer requires WRITE permission on them before overwriting or
    /// deleting the backing definition.
    fn permissions(&self) -> Option<&Permissions> {
        None
    }
}
