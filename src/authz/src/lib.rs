//! # Keyward Authorization Engine
//!
//! Access-control layer of the Keyward secrets service: decides, for every
//! incoming operation, whether the caller may perform it.
//!
//! ## Features
//!
//! - **Prefix wildcards** with specificity scoring (`/kv/payments/*`)
//! - **Most-specific-statement resolution**: action specificity first,
//!   resource specificity second, Deny wins exact ties
//! - **Default deny** for operations no statement matches
//! - **Manifest-fed store** of policies and groups with a single background writer
//!
//! ## Example
//!
//! ```rust
//! use keyward_authz::{Effect, Operation, Policy, Resolver, Statement};
//!
//! let policy = Policy::new(
//!     "payments-readers",
//!     vec![
//!         Statement::new("read", Effect::Allow, ["secret.read"], ["/kv/payments/*"]).unwrap(),
//!         Statement::new("no-root", Effect::Deny, ["secret.read"], ["/kv/payments/root"]).unwrap(),
//!     ],
//! );
//!
//! let resolver = Resolver::new(vec![policy]);
//!
//! assert!(resolver
//!     .is_authorized(&[Operation::new("secret.read", "/kv/payments/db")])
//!     .allowed());
//! assert!(!resolver
//!     .is_authorized(&[Operation::new("secret.read", "/kv/payments/root")])
//!     .allowed());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod matcher;
pub mod policy;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::StoreConfig;
pub use engine::{Decision, Resolver};
pub use error::{AuthzError, ErrorKind, Result};
pub use manifest::{
    ChannelManifestSource, FileManifestSource, Kind, LoadEvent, ManifestEntry, ManifestSource,
};
pub use matcher::Pattern;
pub use policy::{Effect, Group, Policy, Statement};
pub use store::PolicyStore;
pub use types::{Operation, UserInfo};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
