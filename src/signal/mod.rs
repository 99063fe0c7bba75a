/* src/signal/mod.rs */

//!
//! Filesystem notifications for a single configuration file.
//!
//! The parent directory is watched rather than the file, so editors that save by
//! replacing the file keep working. Events for other names in the directory are
//! ignored. Bursts of writes are debounced into one change; a deleted file is polled
//! for until it reappears.

use std::time::Duration;

mod watcher;
mod worker;

pub use watcher::{WatchTarget, Watcher};

/// Configuration for the watcher behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// Quiet period after the last write before a change is emitted.
	pub debounce: Duration,

	/// Poll interval while waiting for a deleted file to reappear.
	pub rewatch_interval: Duration,

	/// Polls before giving up on a deleted file.
	pub rewatch_attempts: u32,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			debounce: Duration::from_millis(100),
			rewatch_interval: Duration::from_millis(500),
			rewatch_attempts: 10,
		}
	}
}

/// What a raw notification means for the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileSignal {
	/// Written, created, or renamed into place.
	Changed,
	/// Deleted or renamed away.
	Removed,
}
