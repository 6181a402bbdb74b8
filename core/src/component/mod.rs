//! Components: the processes that provide input-method engines, as described
//! by XML files in the component directories.
//!
//! A descriptor looks like this:
//!
//! ```xml
//! <component>
//! 	<name>org.freedesktop.IBus.Anthy</name>
//! 	<exec>/usr/libexec/ibus-engine-anthy --ibus</exec>
//! 	<observed-paths>
//! 		<path>~/.anthy</path>
//! 	</observed-paths>
//! 	<engines exec="/usr/libexec/ibus-engine-anthy --xml"/>
//! </component>
//! ```
//!
//! Engines are either listed inline as `<engine>` elements or produced by the
//! command in `<engines exec="..">`, which prints an `<engines>` document.

use std::{fs, path::Path, process::Command};

use ibus_serialize::{serializable, Attachments, DecodeError};
use tracing::{debug, instrument, warn};

use crate::error::FileIOError;

/// Getter and consuming `with_` setter for plain string fields.
macro_rules! string_fields {
	($($field:ident => $with:ident),+ $(,)?) => {$(
		#[must_use]
		pub fn $field(&self) -> &str {
			&self.$field
		}

		#[must_use]
		pub fn $with(mut self, $field: impl Into<String>) -> Self {
			self.$field = $field.into();
			self
		}
	)+};
}

mod engine;
mod error;
mod observed_path;
mod process;
mod xml;

pub use engine::EngineDesc;
pub use error::{ParseError, SpawnError};
pub use observed_path::{expand_path, ObservedPath};

use process::Process;
use xml::{XmlNode, XmlWriter};

/// An engine provider: descriptor metadata, the paths its engines were loaded
/// from, the engines themselves, and (transiently) its running process.
///
/// Clones and decoded copies never share the process of the original; they
/// start out stopped.
#[derive(Debug, Default)]
pub struct Component {
	name: String,
	description: String,
	version: String,
	license: String,
	author: String,
	homepage: String,
	exec: String,
	textdomain: String,
	observed_paths: Vec<ObservedPath>,
	engines: Vec<EngineDesc>,
	attachments: Attachments,
	process: Process,
}

serializable!(Component = "IBusComponent" {
	name,
	description,
	version,
	license,
	author,
	homepage,
	exec,
	textdomain,
	observed_paths,
	engines,
} after_decode = Component::restore_engine_owners);

impl Clone for Component {
	fn clone(&self) -> Self {
		Self {
			name: self.name.clone(),
			description: self.description.clone(),
			version: self.version.clone(),
			license: self.license.clone(),
			author: self.author.clone(),
			homepage: self.homepage.clone(),
			exec: self.exec.clone(),
			textdomain: self.textdomain.clone(),
			observed_paths: self.observed_paths.clone(),
			engines: self.engines.clone(),
			attachments: self.attachments.clone(),
			process: Process::default(),
		}
	}
}

impl PartialEq for Component {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
			&& self.description == other.description
			&& self.version == other.version
			&& self.license == other.license
			&& self.author == other.author
			&& self.homepage == other.homepage
			&& self.exec == other.exec
			&& self.textdomain == other.textdomain
			&& self.observed_paths == other.observed_paths
			&& self.engines == other.engines
			&& self.attachments == other.attachments
	}
}

impl Component {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Default::default()
		}
	}

	string_fields! {
		name => with_name,
		description => with_description,
		version => with_version,
		license => with_license,
		author => with_author,
		homepage => with_homepage,
		exec => with_exec,
		textdomain => with_textdomain,
	}

	#[allow(clippy::unnecessary_wraps)]
	fn restore_engine_owners(&mut self) -> Result<(), DecodeError> {
		for engine in &mut self.engines {
			engine.set_component(&self.name);
		}

		Ok(())
	}

	#[must_use]
	pub fn engines(&self) -> &[EngineDesc] {
		&self.engines
	}

	/// Takes ownership of `engine`, pointing its back-reference at us.
	pub fn add_engine(&mut self, mut engine: EngineDesc) {
		engine.set_component(&self.name);
		self.engines.push(engine);
	}

	#[must_use]
	pub fn observed_paths(&self) -> &[ObservedPath] {
		&self.observed_paths
	}

	/// Observes `path`; with `access_fs` it's stat'ed now, and a directory also
	/// brings in every sub-directory below it.
	pub fn add_observed_path(&mut self, path: impl AsRef<Path>, access_fs: bool) {
		let observed = ObservedPath::new(path, access_fs);
		self.push_observed_path(observed, access_fs);
	}

	fn push_observed_path(&mut self, observed: ObservedPath, access_fs: bool) {
		let sub_dirs = if access_fs && observed.is_dir() {
			observed.traverse(true)
		} else {
			Vec::new()
		};

		self.observed_paths.push(observed);
		self.observed_paths.extend(sub_dirs);
	}

	/// Whether any observed path changed since it was recorded.
	#[must_use]
	pub fn check_modification(&self) -> bool {
		self.observed_paths
			.iter()
			.any(ObservedPath::check_modification)
	}

	/// Loads a descriptor file; the file itself becomes the last observed path.
	#[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
		let path = path.as_ref();
		let source = fs::read_to_string(path).map_err(|e| {
			FileIOError::from_std_io_err_with_msg(path, e, "reading component descriptor")
		})?;

		let mut component = Self::from_xml(&source, true)?;
		component.observed_paths.push(ObservedPath::new(path, true));

		debug!(
			name = %component.name,
			engines = component.engines.len(),
			"Loaded component descriptor;"
		);

		Ok(component)
	}

	/// Parses a `<component>` document. With `access_fs` observed paths are
	/// stat'ed and expanded, otherwise their recorded mtimes are kept.
	pub fn from_xml(source: &str, access_fs: bool) -> Result<Self, ParseError> {
		let root = XmlNode::parse(source)?;
		if root.name != "component" {
			return Err(ParseError::UnexpectedRoot {
				expected: "component",
				found: root.name,
			});
		}

		let mut component = Self::default();
		let mut engines = Vec::new();

		for node in &root.children {
			let text = node.text.clone();
			match node.name.as_str() {
				"name" => component.name = text,
				"description" => component.description = text,
				"version" => component.version = text,
				"license" => component.license = text,
				"author" => component.author = text,
				"homepage" => component.homepage = text,
				"exec" => component.exec = text,
				"textdomain" => component.textdomain = text,
				"observed-paths" => {
					for path in &node.children {
						if path.name != "path" {
							warn!(element = %path.name, "Unknown observed-paths element;");
							continue;
						}

						let observed = ObservedPath::from_xml_node(path, access_fs)?;
						component.push_observed_path(observed, access_fs);
					}
				}
				"engines" => engines.extend(parse_engines(node)?),
				other => warn!(element = other, "Unknown component element;"),
			}
		}

		// Engines may come before <name>, so owners are assigned at the end
		for engine in engines {
			component.add_engine(engine);
		}

		Ok(component)
	}

	/// Descriptor XML that [`Component::from_xml`] reads back.
	#[must_use]
	pub fn to_xml(&self) -> String {
		let mut writer = XmlWriter::new();

		writer.open("component", &[]);
		writer.element("name", &self.name);
		writer.element("description", &self.description);
		writer.element("version", &self.version);
		writer.element("license", &self.license);
		writer.element("author", &self.author);
		writer.element("homepage", &self.homepage);
		writer.element("exec", &self.exec);
		writer.element("textdomain", &self.textdomain);

		if !self.observed_paths.is_empty() {
			writer.open("observed-paths", &[]);
			for observed in &self.observed_paths {
				observed.write_xml(&mut writer);
			}
			writer.close("observed-paths");
		}

		writer.open("engines", &[]);
		for engine in &self.engines {
			engine.write_xml(&mut writer);
		}
		writer.close("engines");

		writer.close("component");
		writer.finish()
	}

	/// Launches the component's `exec` line. Does nothing if it's already
	/// running; needs to be called from within a tokio runtime.
	pub fn start(&self) -> Result<(), SpawnError> {
		self.process.start(&self.name, &self.exec)
	}

	/// Requests termination without waiting for it.
	pub fn stop(&self) {
		self.process.stop();
	}

	#[must_use]
	pub fn is_running(&self) -> bool {
		self.process.is_running()
	}

	#[must_use]
	pub fn pid(&self) -> Option<u32> {
		self.process.pid()
	}

	#[must_use]
	pub fn restart_on_exit(&self) -> bool {
		self.process.restart_on_exit()
	}

	/// Respawn the process whenever it exits without a [`Component::stop`].
	pub fn set_restart_on_exit(&self, restart: bool) {
		self.process.set_restart_on_exit(restart);
	}
}

fn parse_engines(node: &XmlNode) -> Result<Vec<EngineDesc>, ParseError> {
	match node.attribute("exec") {
		Some(exec) => engines_from_exec(exec),
		None => parse_engine_list(node),
	}
}

fn parse_engine_list(node: &XmlNode) -> Result<Vec<EngineDesc>, ParseError> {
	let mut engines = Vec::with_capacity(node.children.len());
	for child in &node.children {
		if child.name == "engine" {
			engines.push(EngineDesc::from_xml_node(child)?);
		} else {
			warn!(element = %child.name, "Unknown engines element;");
		}
	}

	Ok(engines)
}

/// Runs an engine-list helper and parses the `<engines>` document it prints.
fn engines_from_exec(exec: &str) -> Result<Vec<EngineDesc>, ParseError> {
	let failed = |reason: String| ParseError::EnginesExec {
		exec: exec.to_string(),
		reason,
	};

	let argv = process::split_exec(exec).map_err(|e| failed(e.to_string()))?;
	let (program, args) = argv
		.split_first()
		.ok_or_else(|| failed("empty command".to_string()))?;

	let output = Command::new(program)
		.args(args)
		.output()
		.map_err(|e| failed(e.to_string()))?;

	if !output.status.success() {
		return Err(failed(format!("exited with {}", output.status)));
	}

	let stdout = String::from_utf8(output.stdout).map_err(|e| failed(e.to_string()))?;
	let root = XmlNode::parse(&stdout)?;
	if root.name != "engines" {
		return Err(ParseError::UnexpectedRoot {
			expected: "engines",
			found: root.name,
		});
	}

	// A helper pointing at yet another helper could recurse forever
	if let Some(nested) = root.attribute("exec") {
		return Err(failed(format!("output names another command `{nested}`")));
	}

	debug!(%exec, engines = root.children.len(), "Ran engine list command;");

	parse_engine_list(&root)
}
