use std::{
	env, fmt, fs,
	path::{Path, PathBuf},
	time::UNIX_EPOCH,
};

use ibus_serialize::{serializable, Attachments};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use super::{
	error::ParseError,
	xml::{XmlNode, XmlWriter},
};

/// A file or directory whose modification time vouches for the freshness of
/// whatever was loaded from it.
///
/// `mtime` is in whole seconds since the epoch, `0` when the path didn't exist
/// at stat time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedPath {
	path: PathBuf,
	mtime: i64,
	is_dir: bool,
	is_exist: bool,
	attachments: Attachments,
}

serializable!(ObservedPath = "IBusObservedPath" { path, mtime, is_dir, is_exist });

/// Expands a leading `~` to the home directory and a leading `$VAR` to the
/// variable's value. Anything that can't be expanded is kept verbatim.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
	if raw == "~" || raw.starts_with("~/") {
		if let Some(home) = dirs::home_dir() {
			return home.join(raw[1..].trim_start_matches('/'));
		}
	} else if let Some(rest) = raw.strip_prefix('$') {
		let (name, tail) = rest.split_once('/').unwrap_or((rest, ""));
		if let Some(value) = env::var_os(name).filter(|_| !name.is_empty()) {
			return PathBuf::from(value).join(tail);
		}
	}

	PathBuf::from(raw)
}

fn stat(path: &Path) -> Option<(i64, bool)> {
	let metadata = fs::metadata(path).ok()?;
	let mtime = metadata
		.modified()
		.ok()
		.and_then(|time| time.duration_since(UNIX_EPOCH).ok())
		.map_or(0, |since| i64::try_from(since.as_secs()).unwrap_or(i64::MAX));

	Some((mtime, metadata.is_dir()))
}

impl ObservedPath {
	/// Observes `path`, optionally stat'ing it right away.
	#[must_use]
	pub fn new(path: impl AsRef<Path>, fill_stat: bool) -> Self {
		let path = path.as_ref();
		let path = path
			.to_str()
			.map_or_else(|| path.to_path_buf(), expand_path);

		let mut observed = Self {
			path,
			..Default::default()
		};

		if fill_stat {
			observed.fill_stat();
		}

		observed
	}

	/// An observation recorded earlier, as read back from a descriptor.
	#[must_use]
	pub fn with_mtime(path: impl Into<PathBuf>, mtime: i64) -> Self {
		Self {
			path: path.into(),
			mtime,
			..Default::default()
		}
	}

	#[must_use]
	pub fn path(&self) -> &Path {
		&self.path
	}

	#[must_use]
	pub const fn mtime(&self) -> i64 {
		self.mtime
	}

	#[must_use]
	pub const fn is_dir(&self) -> bool {
		self.is_dir
	}

	#[must_use]
	pub const fn is_exist(&self) -> bool {
		self.is_exist
	}

	/// Records the current mtime, existence, and kind of the path.
	pub fn fill_stat(&mut self) {
		if let Some((mtime, is_dir)) = stat(&self.path) {
			self.mtime = mtime;
			self.is_dir = is_dir;
			self.is_exist = true;
		} else {
			self.mtime = 0;
			self.is_dir = false;
			self.is_exist = false;
		}
	}

	/// Current mtime on disk, `0` if the path is gone.
	#[must_use]
	pub fn live_mtime(&self) -> i64 {
		stat(&self.path).map_or(0, |(mtime, _)| mtime)
	}

	/// Whether the path changed since it was observed. The stored mtime is left
	/// alone, so a stale path keeps reporting until it's observed again.
	#[must_use]
	pub fn check_modification(&self) -> bool {
		let live = self.live_mtime();
		if live == self.mtime {
			return false;
		}

		debug!(
			path = %self.path.display(),
			observed = self.mtime,
			live,
			"Observed path was modified;"
		);

		true
	}

	/// Everything below this directory, or only the sub-directories with
	/// `dir_only`, each stat'ed. Unreadable entries are skipped.
	#[must_use]
	pub fn traverse(&self, dir_only: bool) -> Vec<Self> {
		WalkDir::new(&self.path)
			.min_depth(1)
			.sort_by_file_name()
			.into_iter()
			.filter_map(|entry| match entry {
				Ok(entry) => Some(entry),
				Err(e) => {
					warn!(?e, path = %self.path.display(), "Failed to read observed directory entry;");
					None
				}
			})
			.filter(|entry| !dir_only || entry.file_type().is_dir())
			.map(|entry| Self::new(entry.path(), true))
			.collect()
	}

	pub(super) fn from_xml_node(node: &XmlNode, fill_stat: bool) -> Result<Self, ParseError> {
		if node.text.is_empty() {
			return Err(ParseError::InvalidValue {
				element: "path".to_string(),
				value: String::new(),
			});
		}

		let mtime = match node.attribute("mtime") {
			Some(raw) => raw.parse().map_err(|_| ParseError::InvalidValue {
				element: "path".to_string(),
				value: format!("mtime=\"{raw}\""),
			})?,
			None => 0,
		};

		let mut observed = Self::with_mtime(expand_path(&node.text), mtime);
		if fill_stat {
			observed.fill_stat();
		}

		trace!(path = %observed.path.display(), mtime = observed.mtime, "Parsed observed path;");

		Ok(observed)
	}

	pub(super) fn write_xml(&self, writer: &mut XmlWriter) {
		let mtime = self.mtime.to_string();
		writer.element_with("path", &[("mtime", mtime.as_str())], &self.path.to_string_lossy());
	}

	/// The `<path mtime="..">` element a component descriptor lists.
	#[must_use]
	pub fn to_xml(&self) -> String {
		let mut writer = XmlWriter::new();
		self.write_xml(&mut writer);
		writer.finish()
	}
}

impl fmt::Display for ObservedPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.path.display())
	}
}

#[cfg(test)]
mod tests {
	use std::{
		fs::File,
		time::{Duration, SystemTime},
	};

	use ibus_serialize::Serializable;
	use tempfile::tempdir;

	use super::*;

	fn set_mtime(path: &Path, secs: u64) {
		File::options()
			.write(true)
			.open(path)
			.unwrap()
			.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
			.unwrap();
	}

	#[test]
	fn fill_stat_records_files_and_missing_paths() {
		let dir = tempdir().unwrap();
		let file = dir.path().join("anthy.xml");
		fs::write(&file, "<component/>").unwrap();
		set_mtime(&file, 1_600_000_000);

		let observed = ObservedPath::new(&file, true);
		assert!(observed.is_exist());
		assert!(!observed.is_dir());
		assert_eq!(observed.mtime(), 1_600_000_000);

		let missing = ObservedPath::new(dir.path().join("gone"), true);
		assert!(!missing.is_exist());
		assert_eq!(missing.mtime(), 0);

		assert!(ObservedPath::new(dir.path(), true).is_dir());
	}

	#[test]
	fn check_modification_never_heals() {
		let dir = tempdir().unwrap();
		let file = dir.path().join("table.txt");
		fs::write(&file, "a").unwrap();
		set_mtime(&file, 1_600_000_000);

		let observed = ObservedPath::new(&file, true);
		assert!(!observed.check_modification());

		set_mtime(&file, 1_600_000_100);
		assert!(observed.check_modification());
		assert!(observed.check_modification());
		assert_eq!(observed.mtime(), 1_600_000_000);

		fs::remove_file(&file).unwrap();
		assert!(observed.check_modification());
	}

	#[test]
	fn expands_home_and_variables() {
		if let Some(home) = dirs::home_dir() {
			assert_eq!(expand_path("~/.m17n.d"), home.join(".m17n.d"));
			assert_eq!(expand_path("~"), home);
		}

		let path_var = env::var_os("PATH").map(PathBuf::from).unwrap();
		assert_eq!(expand_path("$PATH/x"), path_var.join("x"));

		assert_eq!(
			expand_path("$SURELY_NOT_SET_ANYWHERE_42/x"),
			PathBuf::from("$SURELY_NOT_SET_ANYWHERE_42/x")
		);
		assert_eq!(expand_path("/usr/share/ibus"), PathBuf::from("/usr/share/ibus"));
	}

	#[test]
	fn traverse_lists_sub_directories() {
		let dir = tempdir().unwrap();
		fs::create_dir_all(dir.path().join("a/b")).unwrap();
		fs::write(dir.path().join("a/file"), "").unwrap();

		let observed = ObservedPath::new(dir.path(), true);

		let dirs = observed.traverse(true);
		assert_eq!(
			dirs.iter().map(ObservedPath::path).collect::<Vec<_>>(),
			vec![dir.path().join("a"), dir.path().join("a/b")]
		);
		assert!(dirs.iter().all(ObservedPath::is_dir));

		assert_eq!(observed.traverse(false).len(), 3);
	}

	#[test]
	fn round_trip_keeps_every_field() {
		let dir = tempdir().unwrap();
		let mut observed = ObservedPath::new(dir.path(), true);
		observed.attachments_mut().set("origin", "system");

		assert_eq!(
			ObservedPath::deserialize(&observed.serialize()).unwrap(),
			observed
		);
	}

	#[test]
	fn xml_element() {
		let observed = ObservedPath::with_mtime("/usr/share/m17n", 1234);
		assert_eq!(observed.to_xml(), "<path mtime=\"1234\">/usr/share/m17n</path>\n");

		let node = XmlNode::parse(&observed.to_xml()).unwrap();
		assert_eq!(ObservedPath::from_xml_node(&node, false).unwrap(), observed);
	}
}
