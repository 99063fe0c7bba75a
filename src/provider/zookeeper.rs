/* src/provider/zookeeper.rs */

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use zookeeper_client::{Client, Error as ZkError, EventType, SessionState};

use super::{
	CHANGE_BUFFER, ChangeEvent, Lifecycle, Provider, ProviderError, RETRY_BACKOFF, notify_change,
};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A ZooKeeper node, watched with one-shot data watches re-armed after each change.
pub struct ZookeeperProvider {
	path: String,
	client: Mutex<Option<Client>>,
	lifecycle: Lifecycle,
}

impl std::fmt::Debug for ZookeeperProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ZookeeperProvider")
			.field("path", &self.path)
			.finish_non_exhaustive()
	}
}

impl ZookeeperProvider {
	/// Connects to the ensemble at `endpoints`.
	pub async fn connect(path: impl Into<String>, endpoints: Vec<String>) -> Result<Self, ProviderError> {
		let cluster = connect_string(&endpoints);
		let client = tokio::time::timeout(CONNECT_TIMEOUT, Client::connect(&cluster))
			.await
			.map_err(|_| ProviderError::Connection(format!("timed out connecting to {cluster}")))??;
		Ok(Self {
			path: path.into(),
			client: Mutex::new(Some(client)),
			lifecycle: Lifecycle::default(),
		})
	}

	async fn client(&self) -> Result<Client, ProviderError> {
		self.lifecycle.ensure_open().await?;
		self.client.lock().await.clone().ok_or(ProviderError::Closed)
	}
}

#[async_trait]
impl Provider for ZookeeperProvider {
	fn name(&self) -> &'static str {
		"zookeeper"
	}

	fn location(&self) -> &str {
		&self.path
	}

	async fn load(&self) -> Result<Vec<u8>, ProviderError> {
		let client = self.client().await?;
		match client.get_data(&self.path).await {
			Ok((data, _)) => Ok(data),
			Err(ZkError::NoNode) => Err(ProviderError::NotFound(self.path.clone())),
			Err(e) => Err(e.into()),
		}
	}

	async fn watch(
		&self,
		cancel: CancellationToken,
	) -> Result<Option<mpsc::Receiver<ChangeEvent>>, ProviderError> {
		let client = self.client().await?;
		let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
		let token = self.lifecycle.watch_token(&cancel);
		tokio::spawn(watch_loop(client, self.path.clone(), tx, token));
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

/// What a fired watch means for the loop.
#[derive(Debug, PartialEq, Eq)]
enum WatchOutcome {
	Changed,
	/// Nothing to reload; re-arm.
	Rearm,
	/// The connection dropped; back off and re-arm.
	Retry,
	/// The node or the session is gone.
	Terminal(&'static str),
}

fn outcome(event_type: EventType, session_state: SessionState) -> WatchOutcome {
	match event_type {
		EventType::NodeDataChanged => WatchOutcome::Changed,
		EventType::NodeDeleted => WatchOutcome::Terminal("config node deleted"),
		EventType::Session => match session_state {
			SessionState::Disconnected => WatchOutcome::Retry,
			SessionState::SyncConnected | SessionState::ConnectedReadOnly => WatchOutcome::Rearm,
			_ => WatchOutcome::Terminal("watch lost with session"),
		},
		_ => WatchOutcome::Rearm,
	}
}

async fn watch_loop(
	client: Client,
	path: String,
	tx: mpsc::Sender<ChangeEvent>,
	cancel: CancellationToken,
) {
	tracing::info!(backend = "zookeeper", path = %path, "watching config node");

	loop {
		let armed = tokio::select! {
			_ = cancel.cancelled() => break,
			armed = client.get_and_watch_data(&path) => armed,
		};

		let watcher = match armed {
			Ok((_, _, watcher)) => watcher,
			Err(ZkError::NoNode) => {
				tracing::warn!(backend = "zookeeper", path = %path, "config node deleted, stopping watch");
				break;
			}
			Err(e) => {
				tracing::warn!(backend = "zookeeper", path = %path, error = %e, "failed to set watch");
				tokio::select! {
					_ = cancel.cancelled() => break,
					_ = tokio::time::sleep(RETRY_BACKOFF) => continue,
				}
			}
		};

		let event = tokio::select! {
			_ = cancel.cancelled() => break,
			event = watcher.changed() => event,
		};

		match outcome(event.event_type, event.session_state) {
			WatchOutcome::Changed => {
				tracing::debug!(backend = "zookeeper", path = %path, "config node changed");
				if !notify_change(&tx, ChangeEvent::signal()) {
					break;
				}
			}
			WatchOutcome::Rearm => {}
			WatchOutcome::Retry => {
				tracing::warn!(backend = "zookeeper", path = %path, "disconnected, re-arming watch");
				tokio::select! {
					_ = cancel.cancelled() => break,
					_ = tokio::time::sleep(RETRY_BACKOFF) => {}
				}
			}
			WatchOutcome::Terminal(reason) => {
				tracing::warn!(backend = "zookeeper", path = %path, "{reason}, stopping watch");
				break;
			}
		}
	}

	tracing::info!(backend = "zookeeper", path = %path, "stopped watching config node");
}

fn connect_string(endpoints: &[String]) -> String {
	endpoints.join(",")
}
