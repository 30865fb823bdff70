//! Domain types for credential definitions and their live counterparts.
//!
//! A [`CredentialsDefinition`] is the declarative, serializable description of
//! an account; [`Credentials`] is the live object a parser derives from it.
//! [`CredentialsView`] is the read/display projection used by management
//! surfaces, and [`Revision`] is one entry in a definition's version ledger.

pub mod credentials;
pub mod definition;
pub mod revision;
pub mod view;

pub use credentials::Credentials;
pub use definition::{CredentialsDefinition, Permissions};
pub use revision::Revision;
pub use view::{
    codes, CredentialsError, CredentialsSource, CredentialsStatus, CredentialsView,
    CredentialsViewMetadata,
};
