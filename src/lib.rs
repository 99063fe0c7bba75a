/* src/lib.rs */

//!
//! Configuration loading with strict schema validation and live reloading.
//!
//! This crate integrates four components:
//!
//! - **loader**: Parsing (YAML, falling back to JSON), `${VAR}` expansion, and the
//!   processing pipeline that turns bytes into a finished configuration value.
//! - **validate**: Strict structural validation against a [`SchemaDescriptor`], with
//!   typo suggestions and an operator-facing report.
//! - **provider**: Backing stores (file, Consul, etcd, ZooKeeper, memory) normalized
//!   to load/watch/close.
//! - **controller**: The [`Loader`], which runs the pipeline on load and on every
//!   change signal.
//!
//! ## Feature Flags
//!
//! - `file` (default): Local files watched through filesystem notifications.
//! - `consul`: Consul KV with blocking queries.
//! - `etcd`: etcd v3 with native watches.
//! - `zookeeper`: ZooKeeper with data watches.
//! - `full`: All of the above.
//!
//! ## Basic Usage
//!
//! See `demos/basic.rs` for a complete example.

pub mod controller;
pub mod loader;
pub mod provider;
pub mod validate;

#[cfg(feature = "file")]
pub mod signal;

pub use controller::{
	Loader, LoaderBuilder, LoaderOptions, load_config, load_config_file, load_config_with_loader,
};
pub use loader::{ConfigError, PreProcess, Schema, ValidateConfig, validate_with};
pub use provider::{
	ChangeEvent, MemoryProvider, Provider, ProviderConfig, ProviderError, ProviderKind,
};
pub use validate::{FieldKind, SchemaDescriptor, ValidationResult, validate_structure};

#[cfg(feature = "file")]
pub use provider::FileProvider;
