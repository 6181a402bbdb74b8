use ibus_fs_watcher::WatcherError;
use ibus_serialize::DecodeError;
use thiserror::Error;

use crate::error::FileIOError;

/// Why a cache file was refused. Any of these means "rescan".
#[derive(Debug, Error)]
pub enum CacheCorrupt {
	#[error("file is too short for a header <len='{0}'>")]
	TooShort(usize),
	#[error("bad magic <found='{0:#010x}'>")]
	BadMagic(u32),
	#[error("written by a newer version <found='{found}', supported='{supported}'>")]
	NewerVersion { found: u32, supported: u32 },
	#[error("payload is not a registry: {0}")]
	Payload(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum CacheError {
	#[error("corrupt registry cache: {0}")]
	Corrupt(#[from] CacheCorrupt),
	#[error(transparent)]
	Io(#[from] FileIOError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("failed to set up change monitoring: {0}")]
	Watcher(#[from] WatcherError),
	#[error("change monitoring needs a running tokio runtime")]
	NoRuntime,
}
