/* src/provider/error.rs */

use thiserror::Error;

/// Failures reported by a configuration backend.
#[derive(Debug, Error)]
pub enum ProviderError {
	/// The path, key or node does not exist.
	#[error("not found: {0}")]
	NotFound(String),

	#[error("provider is closed")]
	Closed,

	#[error("connection failed: {0}")]
	Connection(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[cfg(feature = "file")]
	#[error("notify error: {0}")]
	Notify(#[from] notify::Error),

	#[cfg(feature = "consul")]
	#[error("http error: {0}")]
	Http(#[from] reqwest::Error),

	#[cfg(feature = "etcd")]
	#[error("etcd error: {0}")]
	Etcd(#[from] etcd_client::Error),

	#[cfg(feature = "zookeeper")]
	#[error("zookeeper error: {0}")]
	Zookeeper(#[from] zookeeper_client::Error),
}

impl ProviderError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_))
	}
}
