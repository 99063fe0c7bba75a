/* src/loader/error.rs */

use crate::provider::ProviderError;
use crate::validate::ValidationResult;

/// Core error type for loading and processing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// The backing store could not be read.
	#[error("failed to load config from {backend}: {source}")]
	Provider {
		backend: &'static str,
		#[source]
		source: ProviderError,
	},

	/// Neither YAML nor JSON could parse the document.
	#[error("failed to parse config: {0}")]
	Parse(String),

	/// Unknown fields or type mismatches. Displays the full report.
	#[error("configuration has structural errors:\n{0}")]
	Structure(ValidationResult),

	/// The structurally valid document still failed to decode.
	#[error("failed to decode config: {0}")]
	Decode(String),

	/// The schema's own validation rejected the decoded value.
	#[error("config validation failed: {0}")]
	Validation(String),

	/// Validation errors produced by the `validator` crate.
	#[error("config validation failed: {0}")]
	Validator(#[from] validator::ValidationErrors),

	/// A caller-supplied pipeline stage failed.
	#[error("config processing failed: {0}")]
	Stage(String),

	#[error("invalid config type: {0} (valid types: file, consul, etcd, zookeeper)")]
	InvalidKind(String),

	#[error("config path is required")]
	MissingPath,

	/// The selected backend was not compiled in.
	#[error("{0} support is not enabled (enable the `{0}` feature)")]
	Unsupported(&'static str),

	#[error("watch already started")]
	AlreadyWatching,

	#[error("loader is stopped")]
	Stopped,
}

impl ConfigError {
	pub(crate) fn provider(backend: &'static str, source: ProviderError) -> Self {
		Self::Provider { backend, source }
	}

	/// Returns true if the backing store reported that the document does not exist.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			Self::Provider {
				source: ProviderError::NotFound(_),
				..
			}
		)
	}

	/// Returns the structural report, if this is a structural failure.
	pub fn validation_result(&self) -> Option<&ValidationResult> {
		match self {
			Self::Structure(result) => Some(result),
			_ => None,
		}
	}
}
