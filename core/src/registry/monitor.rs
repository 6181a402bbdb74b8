use std::{
	collections::HashSet,
	path::{Path, PathBuf},
	pin::pin,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use async_channel as chan;
use futures::{Stream, StreamExt};
use futures_concurrency::stream::Merge;
use ibus_fs_watcher::{Coalescer, FsEvent, FsEventKind, PathWatcher};
use tokio::{
	runtime::Handle,
	sync::broadcast,
	task::JoinHandle,
	time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info, trace, warn, Instrument};

use super::RegistryError;

const HUNDRED_MILLIS: Duration = Duration::from_millis(100);

/// What a monitor watches, and which of the resulting events count.
///
/// An observed path that doesn't exist can't be watched itself, so its
/// parent directory is watched in its place. Only events on the missing path,
/// or anything below it, are relevant from such a stand-in.
#[derive(Debug, Default, Clone)]
pub(super) struct MonitoredPaths {
	watched: Vec<PathBuf>,
	seen: HashSet<PathBuf>,
	direct: HashSet<PathBuf>,
	missing: HashSet<PathBuf>,
}

impl MonitoredPaths {
	fn push_watched(&mut self, path: &Path) {
		if self.seen.insert(path.to_path_buf()) {
			self.watched.push(path.to_path_buf());
		}
	}

	/// Watches an existing path directly.
	pub(super) fn watch(&mut self, path: &Path) {
		self.direct.insert(path.to_path_buf());
		self.push_watched(path);
	}

	/// Watches `parent` on behalf of `path`, which doesn't exist yet.
	pub(super) fn watch_missing(&mut self, path: &Path, parent: &Path) {
		self.missing.insert(path.to_path_buf());
		self.push_watched(parent);
	}

	/// Paths handed to the watcher, without duplicates, in insertion order.
	pub(super) fn watched(&self) -> &[PathBuf] {
		&self.watched
	}

	/// Whether an event at `path` concerns something observed.
	pub(super) fn is_relevant(&self, path: &Path) -> bool {
		self.direct.contains(path)
			|| path
				.parent()
				.is_some_and(|parent| self.direct.contains(parent))
			|| self.missing.iter().any(|missing| path.starts_with(missing))
	}
}

/// Background task watching every observed path of a registry.
///
/// The first burst of changes, once quiet for the configured period, marks
/// the registry dirty and is announced once; after that the task tears down
/// its watches and exits. A fresh monitor is needed to hear about the next
/// change, normally after the registry was reloaded.
#[derive(Debug)]
pub(super) struct RegistryMonitor {
	handle: Option<JoinHandle<()>>,
	stop_tx: chan::Sender<()>,
}

impl RegistryMonitor {
	pub(super) fn start(
		paths: MonitoredPaths,
		quiet_period: Duration,
		dirty: Arc<AtomicBool>,
		changed_tx: broadcast::Sender<()>,
	) -> Result<Self, RegistryError> {
		let runtime = Handle::try_current().map_err(|_| RegistryError::NoRuntime)?;

		let (mut watcher, events_rx) = PathWatcher::new()?;
		for path in paths.watched() {
			if let Err(e) = watcher.watch(path) {
				warn!(?e, path = %path.display(), "Failed to watch observed path;");
			}
		}

		debug!(
			watched = watcher.len(),
			requested = paths.watched().len(),
			?quiet_period,
			"Started registry monitor;"
		);

		let (stop_tx, stop_rx) = chan::bounded(1);

		let handle = runtime.spawn(
			handle_watch_events(
				watcher,
				events_rx,
				stop_rx,
				paths,
				Coalescer::new(quiet_period),
				dirty,
				changed_tx,
			)
			.in_current_span(),
		);

		Ok(Self {
			handle: Some(handle),
			stop_tx,
		})
	}

	/// Whether the task is still waiting for changes.
	pub(super) fn is_active(&self) -> bool {
		self.handle
			.as_ref()
			.is_some_and(|handle| !handle.is_finished())
	}
}

impl Drop for RegistryMonitor {
	fn drop(&mut self) {
		if self.handle.take().is_some() {
			// Closed means the task already fired and exited
			if self.stop_tx.try_send(()).is_err() {
				trace!("Registry monitor already finished;");
			}
		}
	}
}

async fn handle_watch_events(
	mut watcher: PathWatcher,
	events: impl Stream<Item = FsEvent>,
	stop_rx: chan::Receiver<()>,
	paths: MonitoredPaths,
	mut coalescer: Coalescer,
	dirty: Arc<AtomicBool>,
	changed_tx: broadcast::Sender<()>,
) {
	enum StreamMessage {
		NewEvent(FsEvent),
		Tick,
		Stop,
	}

	let mut tick_interval = interval_at(Instant::now() + HUNDRED_MILLIS, HUNDRED_MILLIS);
	tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

	let mut msg_stream = pin!((
		events.map(StreamMessage::NewEvent),
		IntervalStream::new(tick_interval).map(|_| StreamMessage::Tick),
		stop_rx.map(|()| StreamMessage::Stop),
	)
		.merge());

	while let Some(msg) = msg_stream.next().await {
		match msg {
			StreamMessage::NewEvent(event) => {
				let relevant = paths.is_relevant(&event.path)
					|| matches!(&event.kind, FsEventKind::Rename { from } if paths.is_relevant(from));

				if relevant {
					trace!(kind = ?event.kind, path = %event.path.display(), "Observed path changed;");
					coalescer.record(Instant::now());
				} else {
					trace!(path = %event.path.display(), "Ignoring event next to a missing path;");
				}
			}

			StreamMessage::Tick => {
				if coalescer.tick(Instant::now()) {
					watcher.unwatch_all();
					dirty.store(true, Ordering::Release);

					let receivers = changed_tx.send(()).unwrap_or(0);
					info!(receivers, "Registry changed;");
					break;
				}
			}

			StreamMessage::Stop => {
				debug!("Stopping registry monitor;");
				break;
			}
		}
	}
}
