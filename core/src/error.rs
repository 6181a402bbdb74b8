use std::{fmt, io, path::Path};

use thiserror::Error;

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: io::Error,
	pub maybe_context: Option<&'static str>,
}

impl fmt::Display for FileIOError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "file I/O error")?;
		if let Some(context) = self.maybe_context {
			write!(f, " ({context})")?;
		}
		write!(f, ": {}; path: '{}'", self.source, self.path.display())
	}
}

impl FileIOError {
	pub fn from_std_io_err_with_msg(
		path: impl AsRef<Path>,
		source: io::Error,
		context: &'static str,
	) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(context),
		}
	}
}
