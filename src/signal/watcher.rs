/* src/signal/watcher.rs */

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Config;
use super::worker::process_events;
use crate::provider::{ChangeEvent, ProviderError};

/// The file being watched, split into the directory actually registered with the
/// OS and the name used to filter its events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
	pub path: PathBuf,
	pub dir: PathBuf,
	pub file_name: OsString,
}

impl WatchTarget {
	pub fn new(path: impl Into<PathBuf>) -> Result<Self, ProviderError> {
		let path = path.into();
		let file_name = path.file_name().map(|n| n.to_os_string()).ok_or_else(|| {
			ProviderError::Io(std::io::Error::new(
				std::io::ErrorKind::InvalidInput,
				format!("not a file path: {}", path.display()),
			))
		})?;
		let dir = match path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
			_ => PathBuf::from("."),
		};
		Ok(Self {
			path,
			dir,
			file_name,
		})
	}

	/// Returns true if `path` names the watched file.
	pub fn matches(&self, path: &Path) -> bool {
		path.file_name() == Some(self.file_name.as_os_str())
	}
}

/// A running watch on one file. Dropping it stops the watch.
#[derive(Debug)]
pub struct Watcher {
	task: JoinHandle<()>,
}

impl Watcher {
	/// Registers the parent directory and starts forwarding changes to `tx`.
	///
	/// The watch ends when `cancel` fires or `tx` is closed.
	#[must_use = "Watcher must be kept alive"]
	pub fn start(
		target: WatchTarget,
		config: Config,
		tx: mpsc::Sender<ChangeEvent>,
		cancel: CancellationToken,
	) -> Result<Self, ProviderError> {
		if !target.dir.exists() {
			return Err(ProviderError::NotFound(target.dir.display().to_string()));
		}

		let (raw_tx, raw_rx) = mpsc::channel(100);
		let mut inner = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
			let _ = raw_tx.blocking_send(res);
		})?;
		inner.watch(&target.dir, RecursiveMode::NonRecursive)?;

		tracing::info!(path = %target.path.display(), "watching config file");
		let task = tokio::spawn(process_events(inner, raw_rx, tx, target, config, cancel));
		Ok(Self { task })
	}

	pub fn stop(&self) {
		self.task.abort();
	}

	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}
}

impl Drop for Watcher {
	fn drop(&mut self) {
		self.task.abort();
	}
}

/// Re-registers the directory with the OS after the file came back.
pub(crate) fn rewatch(inner: &mut RecommendedWatcher, target: &WatchTarget) -> notify::Result<()> {
	// The directory may have been recreated; the old registration is stale then.
	let _ = inner.unwatch(&target.dir);
	inner.watch(&target.dir, RecursiveMode::NonRecursive)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_directory_and_name() {
		let target = WatchTarget::new("/etc/app/config.yaml").unwrap();
		assert_eq!(target.dir, PathBuf::from("/etc/app"));
		assert_eq!(target.file_name, OsString::from("config.yaml"));
		assert!(target.matches(Path::new("/etc/app/config.yaml")));
		assert!(!target.matches(Path::new("/etc/app/config.yaml.swp")));
	}

	#[test]
	fn bare_name_watches_current_directory() {
		let target = WatchTarget::new("config.yaml").unwrap();
		assert_eq!(target.dir, PathBuf::from("."));
	}

	#[test]
	fn rejects_paths_without_file_name() {
		assert!(WatchTarget::new("/").is_err());
	}
}
