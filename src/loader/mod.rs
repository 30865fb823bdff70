//! Credential definition loading and change detection.
//!
//! The loader pulls the full definition set from its source on each run,
//! diffs it against the last successfully applied state, and applies only the
//! deltas: removed names are torn down, new and structurally changed
//! definitions are re-parsed, unchanged definitions are skipped entirely.

pub mod basic;
pub mod poller;

pub use basic::CredentialsLoader;
pub use poller::Poller;

use crate::domain::{Credentials, CredentialsDefinition};
use crate::errors::Result;
use async_trait::async_trait;

/// Converts a definition into live credentials.
///
/// Supplied by the embedding service per credential type. `Ok(None)` means
/// "skip this definition quietly, do not error the batch"; an `Err` is
/// isolated by the loader (counted, logged, and retried on the next load
/// cycle). Parsing may perform network I/O (e.g. constructing and probing an
/// SDK client).
#[async_trait]
pub trait CredentialsParser<C: Credentials>: Send + Sync {
    async fn parse(&self, definition: &CredentialsDefinition) -> Result<Option<C>>;
}
