//! The component registry: every component found in the component
//! directories, cached on disk and watched for changes.
//!
//! A daemon normally calls [`Registry::load_or_refresh`] on start-up and then
//! [`Registry::start_monitor_changes`]; when the monitor reports a change the
//! registry is [dirty](Registry::is_dirty) and should be reloaded.

use std::{
	fmt, fs,
	path::Path,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use ibus_serialize::{serializable, Attachments};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::{
	component::{Component, EngineDesc, ObservedPath},
	config::{RegistryConfig, DEFAULT_QUIET_PERIOD},
};

mod cache;
mod error;
mod monitor;

pub use cache::{CacheHeader, CACHE_MAGIC, CACHE_VERSION};
pub use error::{CacheCorrupt, CacheError, RegistryError};

use monitor::{MonitoredPaths, RegistryMonitor};

const CHANGED_CAPACITY: usize = 16;

pub struct Registry {
	observed_paths: Vec<ObservedPath>,
	components: Vec<Component>,
	attachments: Attachments,
	dirty: Arc<AtomicBool>,
	changed_tx: broadcast::Sender<()>,
	monitor: Option<RegistryMonitor>,
}

serializable!(Registry = "IBusRegistry" { observed_paths, components });

impl Default for Registry {
	fn default() -> Self {
		let (changed_tx, _) = broadcast::channel(CHANGED_CAPACITY);

		Self {
			observed_paths: Vec::new(),
			components: Vec::new(),
			attachments: Attachments::new(),
			dirty: Arc::new(AtomicBool::new(false)),
			changed_tx,
			monitor: None,
		}
	}
}

/// Copies the lists; the copy is clean, unmonitored and has no subscribers.
impl Clone for Registry {
	fn clone(&self) -> Self {
		Self {
			observed_paths: self.observed_paths.clone(),
			components: self.components.clone(),
			attachments: self.attachments.clone(),
			..Default::default()
		}
	}
}

impl PartialEq for Registry {
	fn eq(&self, other: &Self) -> bool {
		self.observed_paths == other.observed_paths
			&& self.components == other.components
			&& self.attachments == other.attachments
	}
}

impl fmt::Debug for Registry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registry")
			.field("observed_paths", &self.observed_paths)
			.field("components", &self.components)
			.field("attachments", &self.attachments)
			.field("dirty", &self.is_dirty())
			.field("monitoring", &self.is_monitoring())
			.finish_non_exhaustive()
	}
}

impl Registry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn components(&self) -> &[Component] {
		&self.components
	}

	/// Component directories that were scanned.
	#[must_use]
	pub fn observed_paths(&self) -> &[ObservedPath] {
		&self.observed_paths
	}

	#[must_use]
	pub fn component(&self, name: &str) -> Option<&Component> {
		self.components
			.iter()
			.find(|component| component.name() == name)
	}

	/// Every engine of every component, in load order.
	pub fn engines(&self) -> impl Iterator<Item = &EngineDesc> {
		self.components
			.iter()
			.flat_map(|component| component.engines().iter())
	}

	#[must_use]
	pub fn engine(&self, name: &str) -> Option<&EngineDesc> {
		self.engines().find(|engine| engine.name() == name)
	}

	/// The component that owns `engine`.
	#[must_use]
	pub fn component_of(&self, engine: &EngineDesc) -> Option<&Component> {
		engine.component().and_then(|name| self.component(name))
	}

	/// Forgets every component and observed path. Running processes receive
	/// a stop request as their components are dropped.
	pub fn remove_all(&mut self) {
		self.observed_paths.clear();
		self.components.clear();
	}

	/// Scans the directories named by the environment, see
	/// [`RegistryConfig::from_env`].
	pub fn load(&mut self) {
		self.load_from_directories(&RegistryConfig::from_env().component_dirs);
	}

	/// Observes each directory and loads every `*.xml` descriptor in it.
	/// Unreadable directories and broken descriptors are logged and skipped.
	#[instrument(skip_all)]
	pub fn load_from_directories(&mut self, dirs: impl IntoIterator<Item = impl AsRef<Path>>) {
		for dir in dirs {
			self.load_in_dir(dir.as_ref());
		}

		info!(
			components = self.components.len(),
			engines = self.engines().count(),
			"Loaded components;"
		);
	}

	fn load_in_dir(&mut self, dir: &Path) {
		self.observed_paths.push(ObservedPath::new(dir, true));

		let entries = match fs::read_dir(dir) {
			Ok(entries) => entries,
			Err(e) => {
				warn!(?e, path = %dir.display(), "Failed to read component directory;");
				return;
			}
		};

		let mut descriptors = entries
			.filter_map(|entry| match entry {
				Ok(entry) => Some(entry.path()),
				Err(e) => {
					warn!(?e, path = %dir.display(), "Failed to read component directory entry;");
					None
				}
			})
			.filter(|path| path.extension().is_some_and(|ext| ext == "xml"))
			.collect::<Vec<_>>();
		descriptors.sort();

		for path in descriptors {
			match Component::from_file(&path) {
				Ok(component) => self.components.push(component),
				Err(e) => warn!(?e, path = %path.display(), "Failed to load component;"),
			}
		}
	}

	/// Whether anything loaded from disk changed since it was observed.
	///
	/// Staleness is never cleared by asking again; only a reload does that.
	#[must_use]
	pub fn check_modification(&self) -> bool {
		self.observed_paths
			.iter()
			.any(ObservedPath::check_modification)
			|| self.components.iter().any(Component::check_modification)
	}

	/// The start-up path: use the cache when it's present and current,
	/// otherwise rescan the directories and rewrite the cache.
	#[must_use]
	pub fn load_or_refresh(config: &RegistryConfig) -> Self {
		let mut registry = Self::new();

		let cached = match registry.load_cache(&config.cache_file) {
			Ok(cached) => cached,
			Err(e) => {
				warn!(?e, "Failed to load registry cache, rescanning;");
				false
			}
		};

		if cached && !registry.check_modification() {
			debug!("Registry cache is current;");
			return registry;
		}

		if cached {
			info!("Registry cache is stale, rescanning;");
		}

		registry.remove_all();
		registry.load_from_directories(&config.component_dirs);

		if let Err(e) = registry.save_cache(&config.cache_file) {
			warn!(?e, "Failed to save registry cache;");
		}

		registry
	}

	/// Every path the monitor has to watch: observed paths plus the
	/// sub-directories of observed directories, without duplicates. A path
	/// that doesn't exist yet is watched through its parent directory.
	fn monitored_paths(&self) -> MonitoredPaths {
		let mut paths = MonitoredPaths::default();

		let observed = self
			.observed_paths
			.iter()
			.chain(self.components.iter().flat_map(Component::observed_paths));

		for observed in observed {
			let path = observed.path();

			if path.exists() {
				paths.watch(path);
				if path.is_dir() {
					for sub_dir in observed.traverse(true) {
						paths.watch(sub_dir.path());
					}
				}
			} else if let Some(parent) = path.parent().filter(|parent| parent.is_dir()) {
				paths.watch_missing(path, parent);
			}
		}

		paths
	}

	/// Starts watching with the default quiet period.
	pub fn start_monitor_changes(&mut self) -> Result<(), RegistryError> {
		self.start_monitor_changes_with(DEFAULT_QUIET_PERIOD)
	}

	/// Watches every observed path; once a burst of changes has been quiet
	/// for `quiet_period` the registry turns dirty and `changed` is sent once.
	///
	/// Replaces any monitor already running. Must be called from within a
	/// tokio runtime.
	pub fn start_monitor_changes_with(&mut self, quiet_period: Duration) -> Result<(), RegistryError> {
		self.stop_monitor_changes();

		self.monitor = Some(RegistryMonitor::start(
			self.monitored_paths(),
			quiet_period,
			Arc::clone(&self.dirty),
			self.changed_tx.clone(),
		)?);

		Ok(())
	}

	pub fn stop_monitor_changes(&mut self) {
		if self.monitor.take().is_some() {
			debug!("Stopped registry monitor;");
		}
	}

	/// Whether a monitor is still waiting for changes. A monitor that fired is
	/// no longer active.
	#[must_use]
	pub fn is_monitoring(&self) -> bool {
		self.monitor.as_ref().is_some_and(RegistryMonitor::is_active)
	}

	/// Receives one `()` per announced change.
	#[must_use]
	pub fn subscribe_changes(&self) -> broadcast::Receiver<()> {
		self.changed_tx.subscribe()
	}

	#[must_use]
	pub fn is_dirty(&self) -> bool {
		self.dirty.load(Ordering::Acquire)
	}

	pub fn clear_dirty(&self) {
		self.dirty.store(false, Ordering::Release);
	}
}
