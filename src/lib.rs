//! # Tablesmith
//!
//! A schema provisioning engine for multi-tenant entity templates, usable both
//! as a standalone binary and as a library.
//!
//! A template is a named, typed field list owned by a tenant project. The
//! engine turns it into a physical table, keeps that table in step as fields
//! change, and removes every trace of it again on deletion. Type identifiers
//! stay inside a fixed length ceiling and never collide across projects.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! tablesmith = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tablesmith::config::ProvisionConfig;
//! use tablesmith::lifecycle::TemplateLifecycleManager;
//! use tablesmith::store::{SqliteStore, Store};
//! use tablesmith::types::TemplateValues;
//!
//! let config = ProvisionConfig::with_data_dir("./data");
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let manager = TemplateLifecycleManager::new(Arc::new(store), &config);
//! let outcome = manager.create_template(&TemplateValues {
//!     tenant_id: "t1".into(),
//!     project_id: "p1".into(),
//!     name: "orders".into(),
//!     label: "Orders".into(),
//!     ..Default::default()
//! });
//! assert!(outcome.success);
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod artifacts;
pub mod cleanup;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod hooks;
pub mod identifier;
pub mod lifecycle;
pub mod reconcile;
pub mod registry;
pub mod schema;
pub mod store;
pub mod types;
pub mod validation;
