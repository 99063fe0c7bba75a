/* src/provider/etcd.rs */

use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, EventType, WatchStream, Watcher};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use super::{CHANGE_BUFFER, ChangeEvent, Lifecycle, Provider, ProviderError, notify_change};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// An etcd v3 key, watched through the native watch stream.
pub struct EtcdProvider {
	key: String,
	client: Mutex<Option<Client>>,
	lifecycle: Lifecycle,
}

impl std::fmt::Debug for EtcdProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EtcdProvider")
			.field("key", &self.key)
			.finish_non_exhaustive()
	}
}

impl EtcdProvider {
	/// Connects to the cluster at `endpoints`.
	pub async fn connect(key: impl Into<String>, endpoints: Vec<String>) -> Result<Self, ProviderError> {
		let options = ConnectOptions::new().with_connect_timeout(CONNECT_TIMEOUT);
		let client = Client::connect(&endpoints, Some(options)).await?;
		Ok(Self {
			key: key.into(),
			client: Mutex::new(Some(client)),
			lifecycle: Lifecycle::default(),
		})
	}

	/// A handle to the shared connection. Fails once closed.
	async fn client(&self) -> Result<Client, ProviderError> {
		self.lifecycle.ensure_open().await?;
		self.client.lock().await.clone().ok_or(ProviderError::Closed)
	}
}

#[async_trait]
impl Provider for EtcdProvider {
	fn name(&self) -> &'static str {
		"etcd"
	}

	fn location(&self) -> &str {
		&self.key
	}

	async fn load(&self) -> Result<Vec<u8>, ProviderError> {
		let mut client = self.client().await?;
		let response = client.get(self.key.as_str(), None).await?;
		response
			.kvs()
			.first()
			.map(|kv| kv.value().to_vec())
			.ok_or_else(|| ProviderError::NotFound(self.key.clone()))
	}

	async fn watch(
		&self,
		cancel: CancellationToken,
	) -> Result<Option<mpsc::Receiver<ChangeEvent>>, ProviderError> {
		let mut client = self.client().await?;
		let (watcher, stream) = client.watch(self.key.as_str(), None).await?;

		let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
		let token = self.lifecycle.watch_token(&cancel);
		tokio::spawn(watch_loop(self.key.clone(), watcher, stream, tx, token));
		Ok(Some(rx))
	}

	async fn close(&self) -> Result<(), ProviderError> {
		let mut client = self.client.lock().await;
		if self.lifecycle.close().await {
			client.take();
		}
		Ok(())
	}
}

async fn watch_loop(
	key: String,
	mut watcher: Watcher,
	mut stream: WatchStream,
	tx: mpsc::Sender<ChangeEvent>,
	cancel: CancellationToken,
) {
	tracing::info!(backend = "etcd", key = %key, "watching config key");

	'watch: loop {
		let message = tokio::select! {
			_ = cancel.cancelled() => break,
			message = stream.message() => message,
		};

		let response = match message {
			Ok(Some(response)) => response,
			Ok(None) => {
				tracing::warn!(backend = "etcd", key = %key, "watch stream closed");
				break;
			}
			Err(e) => {
				tracing::warn!(backend = "etcd", key = %key, error = %e, "watch stream failed");
				break;
			}
		};

		if response.canceled() {
			tracing::warn!(backend = "etcd", key = %key, "watch canceled by server");
			break;
		}

		for event in response.events() {
			match event.event_type() {
				EventType::Put => {
					let data = event.kv().map(|kv| kv.value().to_vec());
					tracing::debug!(backend = "etcd", key = %key, "config key changed");
					if !notify_change(&tx, ChangeEvent { data }) {
						break 'watch;
					}
				}
				EventType::Delete => {
					tracing::warn!(backend = "etcd", key = %key, "config key deleted, stopping watch");
					break 'watch;
				}
			}
		}
	}

	if let Err(e) = watcher.cancel().await {
		tracing::debug!(backend = "etcd", key = %key, error = %e, "failed to cancel watch");
	}
	tracing::info!(backend = "etcd", key = %key, "stopped watching config key");
}
