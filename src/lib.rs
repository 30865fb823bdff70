//! # Credplane
//!
//! Credplane is the trust bootstrap layer of a multi-tenant operations
//! platform: it manages the lifecycle of declarative *credential definitions*
//! and turns them into live, usable *credentials*, keeping secret material
//! indirect and access-controlled. Every downstream subsystem that talks to
//! an external account depends on this layer producing a correct,
//! de-duplicated, access-checked view of which accounts exist.
//!
//! ## Architecture
//!
//! Data flows through the system in dependency order:
//!
//! ```text
//! Definition Sources → Composite Source → Loader → Repository → Platform
//!        ↑                                  ↓
//! Storage Contract ← Service/Validation   Secret Resolution
//! ```
//!
//! ## Core Components
//!
//! - **Sources**: full-set definition pulls from static configuration and
//!   the persistent store, merged and de-duplicated per type
//! - **Loader**: diff-based change detection; only new or changed
//!   definitions are re-parsed into live credentials
//! - **Repository**: the concurrency-safe live cache with lifecycle events,
//!   the sole read path for the rest of the platform
//! - **Storage**: CRUD contract with optimistic concurrency and an
//!   append-only revision ledger per definition name
//! - **Service**: validation and authorization gates in front of every
//!   storage mutation
//! - **Secrets**: lazy secret-reference resolution with per-account,
//!   time-of-use authorization tracking
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use credplane::{Config, CredentialsTypeRegistry};
//!
//! let config = Config::from_env()?;
//! credplane::observability::init_tracing(&config.observability)?;
//!
//! let registry = CredentialsTypeRegistry::new();
//! // register each credential type: source, parser, repository
//! registry.register(aws_loader, aws_repository);
//! registry.load_all().await?;
//! ```

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod loader;
pub mod manager;
pub mod observability;
pub mod repository;
pub mod secrets;
pub mod service;
pub mod sources;
pub mod storage;

// Re-export commonly used types and traits
pub use config::Config;
pub use errors::{CredplaneError, Result};
pub use manager::CredentialsTypeRegistry;
pub use observability::init_tracing;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
