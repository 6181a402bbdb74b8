use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
	#[error("failed to create the filesystem watcher backend: {0}")]
	Backend(#[source] notify::Error),
	#[error("failed to watch path <path='{}'>: {source}", .path.display())]
	Watch {
		path: PathBuf,
		#[source]
		source: notify::Error,
	},
}
