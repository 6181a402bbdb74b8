use std::{ffi::OsString, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Overrides the component search path, in the platform's path-list syntax.
pub const COMPONENT_PATH_ENV: &str = "IBUS_COMPONENT_PATH";

pub const SYSTEM_COMPONENT_DIR: &str = "/usr/share/ibus/component";
pub const SYSTEM_CACHE_FILE: &str = "/var/cache/ibus/bus/registry";

/// How long the monitor waits after the first change before announcing it.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(5);

/// Where the registry looks for components and where it caches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
	/// Scanned in order for `*.xml` component descriptors.
	pub component_dirs: Vec<PathBuf>,
	pub cache_file: PathBuf,
	/// Debounce window of the change monitor.
	pub quiet_period: Duration,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			component_dirs: default_component_dirs(),
			cache_file: default_cache_file(),
			quiet_period: DEFAULT_QUIET_PERIOD,
		}
	}
}

impl RegistryConfig {
	/// Defaults, with component directories taken from
	/// [`COMPONENT_PATH_ENV`] when it's set.
	#[must_use]
	pub fn from_env() -> Self {
		Self {
			component_dirs: component_dirs_from(std::env::var_os(COMPONENT_PATH_ENV)),
			..Default::default()
		}
	}
}

/// The system directory followed by the user's data directory.
#[must_use]
pub fn default_component_dirs() -> Vec<PathBuf> {
	let mut dirs = vec![PathBuf::from(SYSTEM_COMPONENT_DIR)];
	if let Some(data_dir) = dirs::data_dir() {
		dirs.push(data_dir.join("ibus").join("component"));
	}
	dirs
}

/// Splits a search path value; unset or empty falls back to the defaults.
#[must_use]
pub fn component_dirs_from(value: Option<OsString>) -> Vec<PathBuf> {
	match value {
		Some(value) if !value.is_empty() => std::env::split_paths(&value)
			.filter(|dir| !dir.as_os_str().is_empty())
			.collect(),
		_ => default_component_dirs(),
	}
}

/// Per-user cache, or the system one when there's no user cache directory.
#[must_use]
pub fn default_cache_file() -> PathBuf {
	dirs::cache_dir().map_or_else(
		|| PathBuf::from(SYSTEM_CACHE_FILE),
		|cache_dir| cache_dir.join("ibus").join("bus").join("registry"),
	)
}
