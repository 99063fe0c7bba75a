/* src/provider/file.rs */

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use super::{CHANGE_BUFFER, ChangeEvent, Lifecycle, Provider, ProviderError};
use crate::signal::{Config as WatcherConfig, WatchTarget, Watcher};

/// A local file, watched through filesystem notifications.
#[derive(Debug)]
pub struct FileProvider {
	path: PathBuf,
	location: String,
	config: WatcherConfig,
	watcher: Mutex<Option<Watcher>>,
	lifecycle: Lifecycle,
}

impl FileProvider {
	/// Creates a provider for `path`, resolved against the current directory.
	pub fn new(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
		Self::with_config(path, WatcherConfig::default())
	}

	/// Like [`new`](Self::new) with custom debounce and rewatch timings.
	pub fn with_config(path: impl AsRef<Path>, config: WatcherConfig) -> Result<Self, ProviderError> {
		let path = std::path::absolute(path.as_ref())?;
		Ok(Self {
			location: path.display().to_string(),
			path,
			config,
			watcher: Mutex::new(None),
			lifecycle: Lifecycle::default(),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

#[async_trait]
impl Provider for FileProvider {
	fn name(&self) -> &'static str {
		"file"
	}

	fn location(&self) -> &str {
		&self.location
	}

	async fn load(&self) -> Result<Vec<u8>, ProviderError> {
		self.lifecycle.ensure_open().await?;
		match fs::read(&self.path).await {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				Err(ProviderError::NotFound(self.location.clone()))
			}
			Err(e) => Err(ProviderError::Io(e)),
		}
	}

	/// Watches the parent directory; one active watch per provider.
	async fn watch(
		&self,
		cancel: CancellationToken,
	) -> Result<Option<mpsc::Receiver<ChangeEvent>>, ProviderError> {
		let mut slot = self.watcher.lock().await;
		self.lifecycle.ensure_open().await?;

		let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
		let target = WatchTarget::new(self.path.clone())?;
		let token = self.lifecycle.watch_token(&cancel);
		let watcher = Watcher::start(target, self.config.clone(), tx, token)?;
		if let Some(previous) = slot.replace(watcher) {
			previous.stop();
		}
		Ok(Some(rx))
	}

	async fn close(&self) -> Result<(), ProviderError> {
		let mut slot = self.watcher.lock().await;
		if self.lifecycle.close().await
			&& let Some(watcher) = slot.take()
		{
			watcher.stop();
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn resolves_relative_paths() {
		let provider = FileProvider::new("config.yaml").unwrap();
		assert!(provider.path().is_absolute());
		assert!(provider.location().ends_with("config.yaml"));
	}

	#[tokio::test]
	async fn missing_file_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let provider = FileProvider::new(dir.path().join("absent.yaml")).unwrap();
		assert!(provider.load().await.unwrap_err().is_not_found());
	}

	#[tokio::test]
	async fn missing_directory_cannot_be_watched() {
		let provider = FileProvider::new("/definitely/not/here/config.yaml").unwrap();
		let err = provider.watch(CancellationToken::new()).await.unwrap_err();
		assert!(err.is_not_found());
	}

	#[tokio::test]
	async fn close_ends_watch_and_rejects_loads() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("app.yaml");
		std::fs::write(&path, "a: 1\n").unwrap();

		let provider = FileProvider::new(&path).unwrap();
		let mut rx = provider.watch(CancellationToken::new()).await.unwrap().unwrap();
		provider.close().await.unwrap();
		provider.close().await.unwrap();

		let ended = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
		assert!(ended.is_none());
		assert!(matches!(provider.load().await, Err(ProviderError::Closed)));
	}

	#[tokio::test]
	async fn recreated_file_emits_change() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("app.yaml");
		std::fs::write(&path, "a: 1\n").unwrap();

		let config = WatcherConfig {
			rewatch_interval: Duration::from_millis(50),
			..WatcherConfig::default()
		};
		let provider = FileProvider::with_config(&path, config).unwrap();
		let mut rx = provider.watch(CancellationToken::new()).await.unwrap().unwrap();
		tokio::time::sleep(Duration::from_millis(50)).await;

		std::fs::remove_file(&path).unwrap();
		tokio::time::sleep(Duration::from_millis(150)).await;
		std::fs::write(&path, "a: 2\n").unwrap();

		let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await.unwrap();
		assert!(event.is_some());
		provider.close().await.unwrap();
	}
}
