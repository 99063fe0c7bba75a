/* src/provider/memory.rs */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use super::{CHANGE_BUFFER, ChangeEvent, Lifecycle, Provider, ProviderError, notify_change};

/// An in-memory provider useful for testing and embedded environments.
///
/// [`set`](Self::set) pushes the new bytes to every active watch;
/// [`remove`](Self::remove) ends them, like a deleted key.
#[derive(Clone, Default)]
pub struct MemoryProvider {
	inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
	key: String,
	data: Mutex<Option<Vec<u8>>>,
	watchers: Mutex<Vec<mpsc::Sender<ChangeEvent>>>,
	lifecycle: Lifecycle,
	closes: AtomicUsize,
}

impl MemoryProvider {
	/// Creates a provider holding `data` under `key`.
	pub fn new(key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
		Self {
			inner: Arc::new(Inner {
				key: key.into(),
				data: Mutex::new(Some(data.into())),
				..Default::default()
			}),
		}
	}

	/// Creates a provider with nothing stored under `key`.
	pub fn empty(key: impl Into<String>) -> Self {
		Self {
			inner: Arc::new(Inner {
				key: key.into(),
				..Default::default()
			}),
		}
	}

	/// Replaces the stored bytes and notifies watchers.
	pub async fn set(&self, data: impl Into<Vec<u8>>) {
		let data = data.into();
		*self.inner.data.lock().await = Some(data.clone());
		let mut watchers = self.inner.watchers.lock().await;
		watchers.retain(|tx| notify_change(tx, ChangeEvent::with_data(data.clone())));
	}

	/// Deletes the stored bytes and ends every watch.
	pub async fn remove(&self) {
		*self.inner.data.lock().await = None;
		self.inner.watchers.lock().await.clear();
	}

	/// Number of times `close` actually released the provider.
	pub fn close_count(&self) -> usize {
		self.inner.closes.load(Ordering::Acquire)
	}
}

#[async_trait]
impl Provider for MemoryProvider {
	fn name(&self) -> &'static str {
		"memory"
	}

	fn location(&self) -> &str {
		&self.inner.key
	}

	async fn load(&self) -> Result<Vec<u8>, ProviderError> {
		self.inner.lifecycle.ensure_open().await?;
		self.inner
			.data
			.lock()
			.await
			.clone()
			.ok_or_else(|| ProviderError::NotFound(self.inner.key.clone()))
	}

	async fn watch(
		&self,
		cancel: CancellationToken,
	) -> Result<Option<mpsc::Receiver<ChangeEvent>>, ProviderError> {
		self.inner.lifecycle.ensure_open().await?;
		let (tx, rx) = mpsc::channel(CHANGE_BUFFER);

		let token = self.inner.lifecycle.watch_token(&cancel);
		let inner = self.inner.clone();
		let weak = tx.downgrade();
		self.inner.watchers.lock().await.push(tx);
		tokio::spawn(async move {
			token.cancelled().await;
			if let Some(tx) = weak.upgrade() {
				inner.watchers.lock().await.retain(|t| !t.same_channel(&tx));
			}
		});

		Ok(Some(rx))
	}

	async fn close(&self) -> Result<(), ProviderError> {
		if self.inner.lifecycle.close().await {
			self.inner.closes.fetch_add(1, Ordering::AcqRel);
			self.inner.watchers.lock().await.clear();
		}
		Ok(())
	}
}
