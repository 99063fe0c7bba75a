/* src/signal/worker.rs */

use notify::RecommendedWatcher;
use notify::event::{EventKind, ModifyKind, RenameMode};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::watcher::{WatchTarget, rewatch};
use super::{Config, FileSignal};
use crate::provider::{ChangeEvent, notify_change};

struct Rewatch {
	next: Instant,
	attempts_left: u32,
}

pub(crate) async fn process_events(
	mut inner: RecommendedWatcher,
	mut raw_rx: mpsc::Receiver<notify::Result<notify::Event>>,
	tx: mpsc::Sender<ChangeEvent>,
	target: WatchTarget,
	config: Config,
	cancel: CancellationToken,
) {
	let path = target.path.display().to_string();
	let mut debounce: Option<Instant> = None;
	let mut pending_rewatch: Option<Rewatch> = None;

	loop {
		tokio::select! {
			_ = cancel.cancelled() => break,
			_ = tx.closed() => break,
			maybe_event = raw_rx.recv() => {
				let Some(result) = maybe_event else { break };
				let event = match result {
					Ok(event) => event,
					Err(e) => {
						tracing::error!(path = %path, error = %e, "file watcher error");
						continue;
					}
				};
				match classify(&event, &target) {
					Some(FileSignal::Changed) => {
						// Each event in a burst pushes the deadline out.
						debounce = Some(Instant::now() + config.debounce);
						pending_rewatch = None;
					}
					Some(FileSignal::Removed) => {
						tracing::warn!(path = %path, "config file was deleted");
						debounce = None;
						pending_rewatch = Some(Rewatch {
							next: Instant::now() + config.rewatch_interval,
							attempts_left: config.rewatch_attempts,
						});
					}
					None => {}
				}
			}
			_ = sleep_until(debounce) => {
				debounce = None;
				tracing::debug!(path = %path, "config file changed");
				if !notify_change(&tx, ChangeEvent::signal()) {
					break;
				}
			}
			_ = sleep_until(pending_rewatch.as_ref().map(|r| r.next)) => {
				let Some(mut state) = pending_rewatch.take() else { continue };
				state.attempts_left = state.attempts_left.saturating_sub(1);

				if tokio::fs::try_exists(&target.path).await.unwrap_or(false) {
					match rewatch(&mut inner, &target) {
						Ok(()) => {
							tracing::info!(path = %path, "re-established watch on config file");
							if !notify_change(&tx, ChangeEvent::signal()) {
								break;
							}
							continue;
						}
						Err(e) => tracing::warn!(path = %path, error = %e, "failed to re-register watch"),
					}
				}

				if state.attempts_left == 0 {
					tracing::warn!(path = %path, "failed to re-establish watch on config file");
				} else {
					state.next = Instant::now() + config.rewatch_interval;
					pending_rewatch = Some(state);
				}
			}
		}
	}

	tracing::info!(path = %path, "stopped watching config file");
}

/// Sleeps until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

fn classify(event: &notify::Event, target: &WatchTarget) -> Option<FileSignal> {
	match event.kind {
		EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
			// paths = [from, to]
			if event.paths.get(1).is_some_and(|p| target.matches(p)) {
				Some(FileSignal::Changed)
			} else if event.paths.first().is_some_and(|p| target.matches(p)) {
				Some(FileSignal::Removed)
			} else {
				None
			}
		}
		_ if !event.paths.iter().any(|p| target.matches(p)) => None,
		EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
			Some(FileSignal::Removed)
		}
		EventKind::Create(_) | EventKind::Modify(_) => Some(FileSignal::Changed),
		_ => None,
	}
}
