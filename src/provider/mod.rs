/* src/provider/mod.rs */

//!
//! Backing stores for configuration documents.
//!
//! Every backend is normalized to the same three operations: read the document
//! once, stream change notifications, release resources.
//!
//! - [`FileProvider`] - local file, filesystem notifications (`file` feature)
//! - [`ConsulProvider`] - Consul KV, blocking queries (`consul` feature)
//! - [`EtcdProvider`] - etcd v3, native watch stream (`etcd` feature)
//! - [`ZookeeperProvider`] - ZooKeeper node, one-shot data watches (`zookeeper` feature)
//! - [`MemoryProvider`] - in-process bytes

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::loader::ConfigError;

mod error;
mod memory;

pub use error::ProviderError;
pub use memory::MemoryProvider;

#[cfg(feature = "file")]
mod file;
#[cfg(feature = "file")]
pub use file::FileProvider;

#[cfg(feature = "consul")]
mod consul;
#[cfg(feature = "consul")]
pub use consul::ConsulProvider;

#[cfg(feature = "etcd")]
mod etcd;
#[cfg(feature = "etcd")]
pub use etcd::EtcdProvider;

#[cfg(feature = "zookeeper")]
mod zookeeper;
#[cfg(feature = "zookeeper")]
pub use zookeeper::ZookeeperProvider;

/// Delay before retrying after a transient backend error in a watch loop.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Capacity of every change channel. A full channel means a change is already pending.
pub(crate) const CHANGE_BUFFER: usize = 1;

/// A change notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeEvent {
	/// The new document, when the backend delivers it with the notification.
	pub data: Option<Vec<u8>>,
}

impl ChangeEvent {
	/// A bare signal; the consumer reloads.
	pub fn signal() -> Self {
		Self { data: None }
	}

	pub fn with_data(data: Vec<u8>) -> Self {
		Self { data: Some(data) }
	}
}

/// Sends without waiting. Returns false once the receiver is gone.
pub(crate) fn notify_change(tx: &mpsc::Sender<ChangeEvent>, event: ChangeEvent) -> bool {
	match tx.try_send(event) {
		Ok(()) => true,
		Err(mpsc::error::TrySendError::Full(_)) => {
			tracing::debug!("change already pending, coalescing");
			true
		}
		Err(mpsc::error::TrySendError::Closed(_)) => false,
	}
}

/// A configuration backend.
#[async_trait]
pub trait Provider: Send + Sync {
	/// Backend identifier used in logs and errors.
	fn name(&self) -> &'static str;

	/// Path, key or node this provider reads.
	fn location(&self) -> &str;

	/// Fetches the document once.
	async fn load(&self) -> Result<Vec<u8>, ProviderError>;

	/// Starts watching for changes.
	///
	/// Returns `Ok(None)` when the backend cannot watch. The stream ends when
	/// `cancel` fires, when the provider is closed, or when the watched resource
	/// is deleted.
	async fn watch(
		&self,
		cancel: CancellationToken,
	) -> Result<Option<mpsc::Receiver<ChangeEvent>>, ProviderError>;

	/// Releases the backend. Idempotent; terminates any active watch.
	async fn close(&self) -> Result<(), ProviderError>;
}

/// Open/closed state shared by every provider.
///
/// `close` flips the flag once and cancels the shutdown token, which every watch
/// loop of the provider observes.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
	closed: Mutex<bool>,
	shutdown: CancellationToken,
}

impl Lifecycle {
	pub(crate) async fn ensure_open(&self) -> Result<(), ProviderError> {
		if *self.closed.lock().await {
			Err(ProviderError::Closed)
		} else {
			Ok(())
		}
	}

	/// Returns true only for the call that actually closed.
	pub(crate) async fn close(&self) -> bool {
		let mut closed = self.closed.lock().await;
		if *closed {
			return false;
		}
		*closed = true;
		self.shutdown.cancel();
		true
	}

	/// A token cancelled when either the caller's token or the provider shuts down.
	pub(crate) fn watch_token(&self, cancel: &CancellationToken) -> CancellationToken {
		let token = self.shutdown.child_token();
		let linked = token.clone();
		let cancel = cancel.clone();
		tokio::spawn(async move {
			tokio::select! {
				_ = cancel.cancelled() => linked.cancel(),
				_ = linked.cancelled() => {}
			}
		});
		token
	}
}

/// Backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ProviderKind {
	#[default]
	File,
	Consul,
	Etcd,
	Zookeeper,
}

impl ProviderKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::File => "file",
			Self::Consul => "consul",
			Self::Etcd => "etcd",
			Self::Zookeeper => "zookeeper",
		}
	}

	/// Endpoints used when none are configured.
	pub fn default_endpoints(&self) -> Vec<String> {
		match self {
			Self::File => Vec::new(),
			Self::Consul => vec!["localhost:8500".to_string()],
			Self::Etcd => vec!["localhost:2379".to_string()],
			Self::Zookeeper => vec!["localhost:2181".to_string()],
		}
	}
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ProviderKind {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"file" => Ok(Self::File),
			"consul" => Ok(Self::Consul),
			"etcd" => Ok(Self::Etcd),
			"zookeeper" | "zk" => Ok(Self::Zookeeper),
			_ => Err(ConfigError::InvalidKind(s.to_string())),
		}
	}
}

impl TryFrom<String> for ProviderKind {
	type Error = ConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

/// Where to read configuration from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
	#[serde(rename = "type")]
	pub kind: ProviderKind,
	/// File path, Consul key, etcd key or ZooKeeper node path.
	pub path: String,
	/// Empty means the defaults of `kind`.
	pub endpoints: Vec<String>,
}

impl ProviderConfig {
	pub fn new(kind: ProviderKind, path: impl Into<String>) -> Self {
		Self {
			kind,
			path: path.into(),
			endpoints: Vec::new(),
		}
	}

	pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.endpoints = endpoints.into_iter().map(Into::into).collect();
		self
	}

	/// Configured endpoints, or the defaults of the backend kind.
	pub fn resolved_endpoints(&self) -> Vec<String> {
		if self.endpoints.is_empty() {
			self.kind.default_endpoints()
		} else {
			self.endpoints.clone()
		}
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.path.trim().is_empty() {
			return Err(ConfigError::MissingPath);
		}
		Ok(())
	}
}

/// Creates and connects the provider selected by `config`.
pub async fn connect(config: &ProviderConfig) -> Result<Box<dyn Provider>, ConfigError> {
	config.validate()?;
	let endpoints = config.resolved_endpoints();
	tracing::debug!(backend = %config.kind, path = %config.path, ?endpoints, "connecting provider");

	match config.kind {
		ProviderKind::File => connect_file(&config.path),
		ProviderKind::Consul => connect_consul(&config.path, endpoints),
		ProviderKind::Etcd => connect_etcd(&config.path, endpoints).await,
		ProviderKind::Zookeeper => connect_zookeeper(&config.path, endpoints).await,
	}
}

#[cfg(feature = "file")]
fn connect_file(path: &str) -> Result<Box<dyn Provider>, ConfigError> {
	let provider = FileProvider::new(path).map_err(|e| ConfigError::provider("file", e))?;
	Ok(Box::new(provider))
}

#[cfg(not(feature = "file"))]
fn connect_file(_path: &str) -> Result<Box<dyn Provider>, ConfigError> {
	Err(ConfigError::Unsupported("file"))
}

#[cfg(feature = "consul")]
fn connect_consul(key: &str, endpoints: Vec<String>) -> Result<Box<dyn Provider>, ConfigError> {
	let provider =
		ConsulProvider::new(key, endpoints).map_err(|e| ConfigError::provider("consul", e))?;
	Ok(Box::new(provider))
}

#[cfg(not(feature = "consul"))]
fn connect_consul(_key: &str, _endpoints: Vec<String>) -> Result<Box<dyn Provider>, ConfigError> {
	Err(ConfigError::Unsupported("consul"))
}

#[cfg(feature = "etcd")]
async fn connect_etcd(key: &str, endpoints: Vec<String>) -> Result<Box<dyn Provider>, ConfigError> {
	let provider = EtcdProvider::connect(key, endpoints)
		.await
		.map_err(|e| ConfigError::provider("etcd", e))?;
	Ok(Box::new(provider))
}

#[cfg(not(feature = "etcd"))]
async fn connect_etcd(_key: &str, _endpoints: Vec<String>) -> Result<Box<dyn Provider>, ConfigError> {
	Err(ConfigError::Unsupported("etcd"))
}

#[cfg(feature = "zookeeper")]
async fn connect_zookeeper(
	path: &str,
	endpoints: Vec<String>,
) -> Result<Box<dyn Provider>, ConfigError> {
	let provider = ZookeeperProvider::connect(path, endpoints)
		.await
		.map_err(|e| ConfigError::provider("zookeeper", e))?;
	Ok(Box::new(provider))
}

#[cfg(not(feature = "zookeeper"))]
async fn connect_zookeeper(
	_path: &str,
	_endpoints: Vec<String>,
) -> Result<Box<dyn Provider>, ConfigError> {
	Err(ConfigError::Unsupported("zookeeper"))
}
