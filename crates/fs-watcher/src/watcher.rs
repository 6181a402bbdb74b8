use std::{
	collections::HashSet,
	path::{Path, PathBuf},
};

use async_channel as chan;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, trace, warn};

use crate::{FsEvent, WatcherError};

/// Watches an explicit set of paths, one non-recursive watch each.
///
/// Normalized events are delivered on the channel returned by
/// [`PathWatcher::new`]. Dropping the watcher stops the backend and closes the
/// channel.
#[derive(Debug)]
pub struct PathWatcher {
	watcher: RecommendedWatcher,
	watched: HashSet<PathBuf>,
}

impl PathWatcher {
	pub fn new() -> Result<(Self, chan::Receiver<FsEvent>), WatcherError> {
		let (events_tx, events_rx) = chan::unbounded();

		let watcher = RecommendedWatcher::new(
			move |result: notify::Result<Event>| match result {
				Ok(event) => {
					let Some(fs_event) = FsEvent::from_notify(event) else {
						return;
					};

					if events_tx.is_closed() {
						trace!("Dropping filesystem event, receiver is gone;");
						return;
					}

					// SAFETY: we are not blocking the thread as this is an unbounded channel
					if events_tx.send_blocking(fs_event).is_err() {
						error!("Unable to forward filesystem event;");
					}
				}
				Err(e) => error!(?e, "Watcher error;"),
			},
			Config::default(),
		)
		.map_err(WatcherError::Backend)?;

		Ok((
			Self {
				watcher,
				watched: HashSet::new(),
			},
			events_rx,
		))
	}

	/// Starts watching `path`; `Ok(false)` if it was already being watched.
	pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<bool, WatcherError> {
		let path = path.as_ref();

		if self.watched.contains(path) {
			return Ok(false);
		}

		self.watcher
			.watch(path, RecursiveMode::NonRecursive)
			.map_err(|source| WatcherError::Watch {
				path: path.to_path_buf(),
				source,
			})?;

		trace!(path = %path.display(), "Watching path;");
		self.watched.insert(path.to_path_buf());

		Ok(true)
	}

	/// Drops every watch, leaving the watcher reusable.
	pub fn unwatch_all(&mut self) {
		for path in self.watched.drain() {
			if let Err(e) = self.watcher.unwatch(&path) {
				// Removed paths lose their watch on their own
				warn!(?e, path = %path.display(), "Failed to unwatch path;");
			}
		}
	}

	#[must_use]
	pub fn is_watching(&self, path: impl AsRef<Path>) -> bool {
		self.watched.contains(path.as_ref())
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.watched.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.watched.is_empty()
	}
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
	use super::*;

	use std::{fs, time::Duration};

	use tempfile::tempdir;
	use tokio::time::timeout;
	use tracing_test::traced_test;

	#[tokio::test]
	#[traced_test]
	async fn test_reports_file_creation_in_watched_dir() {
		let dir = tempdir().unwrap();
		let (mut watcher, events_rx) = PathWatcher::new().unwrap();

		assert!(watcher.watch(dir.path()).unwrap());
		assert!(!watcher.watch(dir.path()).unwrap());
		assert_eq!(watcher.len(), 1);

		let file = dir.path().join("engine.xml");
		fs::write(&file, "<component/>").unwrap();

		let event = timeout(Duration::from_secs(5), async {
			loop {
				let event = events_rx.recv().await.unwrap();
				if event.kind.is_create() {
					break event;
				}
			}
		})
		.await
		.unwrap();

		assert_eq!(event.path, file);
	}

	#[tokio::test]
	async fn test_missing_path_is_an_error() {
		let dir = tempdir().unwrap();
		let (mut watcher, _events_rx) = PathWatcher::new().unwrap();

		assert!(matches!(
			watcher.watch(dir.path().join("nope")),
			Err(WatcherError::Watch { .. })
		));
		assert!(watcher.is_empty());
	}

	#[tokio::test]
	async fn test_unwatch_all() {
		let dir = tempdir().unwrap();
		let (mut watcher, _events_rx) = PathWatcher::new().unwrap();

		watcher.watch(dir.path()).unwrap();
		watcher.unwatch_all();

		assert!(!watcher.is_watching(dir.path()));
		assert!(watcher.watch(dir.path()).unwrap());
	}
}
