use std::io;

use thiserror::Error;

use crate::error::FileIOError;

/// Failure to turn a descriptor into a component or engine list.
#[derive(Debug, Error)]
pub enum ParseError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("malformed XML: {0}")]
	Xml(#[from] quick_xml::Error),
	#[error("document has no root element")]
	Empty,
	#[error("unbalanced document: {0}")]
	Unbalanced(&'static str),
	#[error("unexpected root element <expected='{expected}', found='{found}'>")]
	UnexpectedRoot {
		expected: &'static str,
		found: String,
	},
	#[error("invalid value in <{element}>: '{value}'")]
	InvalidValue { element: String, value: String },
	#[error("engine list command failed <exec='{exec}'>: {reason}")]
	EnginesExec { exec: String, reason: String },
}

/// Failure to launch a component's process.
#[derive(Debug, Error)]
pub enum SpawnError {
	#[error("component exec line can't be split into arguments <exec='{0}'>")]
	InvalidExec(String),
	#[error("no tokio runtime to supervise the component process from")]
	NoRuntime,
	#[error("failed to spawn component process <exec='{exec}'>: {source}")]
	Spawn {
		exec: String,
		#[source]
		source: io::Error,
	},
}
