//! On-disk registry cache.
//!
//! ```text
//! | magic (u32 BE) | version (u32 BE) | encoded Registry tuple |
//! ```
//!
//! Loading never trusts a cache blindly: the header is checked, the payload
//! is decoded in full before anything is replaced, and the caller still has
//! to ask [`Registry::check_modification`] whether what was cached is current.

use std::{
	fs,
	io::{self, Write},
	path::Path,
};

use ibus_serialize::Serializable;
use tempfile::NamedTempFile;
use tracing::{debug, instrument, trace};

use super::{CacheCorrupt, CacheError, Registry};
use crate::error::FileIOError;

/// "IBUS" in ASCII.
pub const CACHE_MAGIC: u32 = 0x4942_5553;
/// Bumped whenever a cached type gains a field.
pub const CACHE_VERSION: u32 = 0x0001_0000;

const HEADER_LEN: usize = 8;

/// The fixed-size prefix of a cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHeader {
	pub magic: u32,
	pub version: u32,
}

impl CacheHeader {
	#[must_use]
	pub const fn current() -> Self {
		Self {
			magic: CACHE_MAGIC,
			version: CACHE_VERSION,
		}
	}

	#[must_use]
	pub fn to_bytes(self) -> [u8; HEADER_LEN] {
		let mut bytes = [0; HEADER_LEN];
		bytes[..4].copy_from_slice(&self.magic.to_be_bytes());
		bytes[4..].copy_from_slice(&self.version.to_be_bytes());
		bytes
	}

	/// Validates the header of `data`, returning the payload behind it.
	///
	/// Older versions are accepted since fields are only ever appended.
	pub fn check(data: &[u8]) -> Result<&[u8], CacheCorrupt> {
		if data.len() < HEADER_LEN {
			return Err(CacheCorrupt::TooShort(data.len()));
		}

		let (header, payload) = data.split_at(HEADER_LEN);
		let mut magic = [0; 4];
		let mut version = [0; 4];
		magic.copy_from_slice(&header[..4]);
		version.copy_from_slice(&header[4..]);

		let magic = u32::from_be_bytes(magic);
		if magic != CACHE_MAGIC {
			return Err(CacheCorrupt::BadMagic(magic));
		}

		let version = u32::from_be_bytes(version);
		if version > CACHE_VERSION {
			return Err(CacheCorrupt::NewerVersion {
				found: version,
				supported: CACHE_VERSION,
			});
		}

		Ok(payload)
	}
}

impl Registry {
	/// Replaces the registry's lists with the ones cached at `path`.
	///
	/// `Ok(false)` when there is no cache; on any error the registry is left
	/// untouched.
	#[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
	pub fn load_cache(&mut self, path: impl AsRef<Path>) -> Result<bool, CacheError> {
		let path = path.as_ref();

		let data = match fs::read(path) {
			Ok(data) => data,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				debug!("No registry cache;");
				return Ok(false);
			}
			Err(e) => {
				return Err(
					FileIOError::from_std_io_err_with_msg(path, e, "reading registry cache")
						.into(),
				)
			}
		};

		let payload = CacheHeader::check(&data)?;
		let cached = Self::deserialize(payload).map_err(CacheCorrupt::Payload)?;

		debug!(
			components = cached.components.len(),
			observed_paths = cached.observed_paths.len(),
			"Loaded registry cache;"
		);

		self.observed_paths = cached.observed_paths;
		self.components = cached.components;
		self.attachments = cached.attachments;

		Ok(true)
	}

	/// Writes the registry to `path` through a temporary sibling file, so a
	/// reader never sees a half-written cache.
	#[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
	pub fn save_cache(&self, path: impl AsRef<Path>) -> Result<(), CacheError> {
		let path = path.as_ref();
		let dir = path
			.parent()
			.filter(|parent| !parent.as_os_str().is_empty())
			.unwrap_or_else(|| Path::new("."));

		fs::create_dir_all(dir).map_err(|e| {
			FileIOError::from_std_io_err_with_msg(dir, e, "creating registry cache directory")
		})?;

		let mut file = NamedTempFile::new_in(dir).map_err(|e| {
			FileIOError::from_std_io_err_with_msg(dir, e, "creating temporary registry cache")
		})?;

		file.write_all(&CacheHeader::current().to_bytes())
			.and_then(|()| file.write_all(&self.serialize()))
			.and_then(|()| file.as_file().sync_all())
			.map_err(|e| {
				FileIOError::from_std_io_err_with_msg(file.path(), e, "writing registry cache")
			})?;

		file.persist(path).map_err(|e| {
			FileIOError::from_std_io_err_with_msg(path, e.error, "replacing registry cache")
		})?;

		// Temporary files are created owner-only; the cache is meant to be shared
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;

			fs::set_permissions(path, fs::Permissions::from_mode(0o644)).map_err(|e| {
				FileIOError::from_std_io_err_with_msg(path, e, "setting registry cache permissions")
			})?;
		}

		trace!(components = self.components.len(), "Saved registry cache;");

		Ok(())
	}
}
