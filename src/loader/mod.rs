/* src/loader/mod.rs */

//!
//! Turning raw bytes into a finished configuration value.
//!
//! Bytes are parsed ([`format`]), environment references are expanded ([`env`]),
//! the document is checked against the target's [`Schema`], decoded, and handed to
//! the target's own hooks ([`PreProcess`], [`ValidateConfig`]). [`Pipeline`] runs
//! these steps in order.

pub mod env;
mod error;
pub mod format;
mod pipeline;

pub use env::{ProcessEnv, VarSource, expand_env_vars, expand_with};
pub use error::ConfigError;
pub use format::{AnyFormat, Json, Yaml, parse_document};
pub use pipeline::{Pipeline, Stage};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::validate::SchemaDescriptor;

/// An untyped parsed document. The root is always a mapping.
pub type Document = serde_json::Map<String, Value>;

/// Abstract format parser that converts bytes into an untyped value.
pub trait Format: Send + Sync {
	/// Short identifier used in error messages.
	fn name(&self) -> &'static str;

	/// Parse the raw bytes.
	fn parse(&self, input: &[u8]) -> Result<Value, ConfigError>;
}

/// A configuration type with a declared shape.
///
/// The descriptor drives strict validation: every key of the document must be
/// declared at its level.
pub trait Schema: DeserializeOwned + Send + Sync + 'static {
	fn schema() -> SchemaDescriptor;
}

/// A hook to process data after decoding but before validation.
pub trait PreProcess {
	/// Fill defaults or normalize values.
	fn pre_process(&mut self) {}
	/// Receives the location the document was loaded from (path or key).
	fn set_context(&mut self, _ctx: &str) {}
}

/// Domain validation run after defaults are applied.
pub trait ValidateConfig {
	fn validate_config(&self) -> Result<(), ConfigError> {
		Ok(())
	}
}

/// Adapts a type deriving `validator::Validate` for use in
/// [`ValidateConfig::validate_config`].
pub fn validate_with<T: validator::Validate>(value: &T) -> Result<(), ConfigError> {
	value.validate().map_err(ConfigError::from)
}
