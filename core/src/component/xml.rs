//! Minimal element tree over `quick-xml`, enough for component descriptors.

use quick_xml::{
	events::{BytesEnd, BytesStart, BytesText, Event},
	Reader, Writer,
};
use tracing::error;

use super::error::ParseError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct XmlNode {
	pub name: String,
	pub attributes: Vec<(String, String)>,
	/// Concatenated, trimmed character data directly inside this element.
	pub text: String,
	pub children: Vec<XmlNode>,
}

impl XmlNode {
	fn open(start: &BytesStart<'_>) -> Result<Self, ParseError> {
		let attributes = start
			.attributes()
			.map(|attr| {
				let attr = attr.map_err(quick_xml::Error::from)?;
				Ok((
					String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
					attr.unescape_value()?.into_owned(),
				))
			})
			.collect::<Result<_, ParseError>>()?;

		Ok(Self {
			name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
			attributes,
			..Default::default()
		})
	}

	/// Parses a document into its root element.
	pub fn parse(source: &str) -> Result<Self, ParseError> {
		let mut reader = Reader::from_str(source);
		reader.config_mut().trim_text(true);

		let mut stack: Vec<Self> = Vec::new();
		let mut root = None;

		loop {
			match reader.read_event()? {
				Event::Start(start) => stack.push(Self::open(&start)?),
				Event::Empty(start) => {
					let node = Self::open(&start)?;
					attach(&mut stack, &mut root, node)?;
				}
				Event::End(_) => {
					let node = stack
						.pop()
						.ok_or(ParseError::Unbalanced("closing tag without opening tag"))?;
					attach(&mut stack, &mut root, node)?;
				}
				Event::Text(text) => {
					if let Some(node) = stack.last_mut() {
						node.text.push_str(&text.unescape()?);
					}
				}
				Event::CData(data) => {
					if let Some(node) = stack.last_mut() {
						node.text.push_str(&String::from_utf8_lossy(&data));
					}
				}
				Event::Eof => break,
				Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
			}
		}

		if !stack.is_empty() {
			return Err(ParseError::Unbalanced("unclosed element at end of document"));
		}

		root.ok_or(ParseError::Empty)
	}

	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.as_str())
	}
}

fn attach(
	stack: &mut [XmlNode],
	root: &mut Option<XmlNode>,
	node: XmlNode,
) -> Result<(), ParseError> {
	if let Some(parent) = stack.last_mut() {
		parent.children.push(node);
	} else if root.is_some() {
		return Err(ParseError::Unbalanced("more than one root element"));
	} else {
		*root = Some(node);
	}

	Ok(())
}

/// Indented descriptor writer; one element per line, tab indented.
pub(crate) struct XmlWriter {
	writer: Writer<Vec<u8>>,
}

impl Default for XmlWriter {
	fn default() -> Self {
		Self::new()
	}
}

impl XmlWriter {
	pub fn new() -> Self {
		Self {
			writer: Writer::new_with_indent(Vec::new(), b'\t', 1),
		}
	}

	fn write(&mut self, event: Event<'_>) {
		// Only allocation failure can make writing into a Vec<u8> fail
		if let Err(e) = self.writer.write_event(event) {
			error!(?e, "Failed to write descriptor XML;");
		}
	}

	fn start<'a>(name: &'a str, attributes: &[(&'a str, &'a str)]) -> BytesStart<'a> {
		let mut start = BytesStart::new(name);
		for attribute in attributes {
			start.push_attribute(*attribute);
		}
		start
	}

	pub fn open(&mut self, name: &str, attributes: &[(&str, &str)]) {
		self.write(Event::Start(Self::start(name, attributes)));
	}

	pub fn close(&mut self, name: &str) {
		self.write(Event::End(BytesEnd::new(name)));
	}

	/// Writes `<name ..>text</name>`, or `<name ../>` for empty text.
	pub fn element_with(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) {
		if text.is_empty() {
			self.write(Event::Empty(Self::start(name, attributes)));
			return;
		}

		self.write(Event::Start(Self::start(name, attributes)));
		self.write(Event::Text(BytesText::new(text)));
		self.write(Event::End(BytesEnd::new(name)));
	}

	/// Writes `<name>text</name>`, skipped entirely for empty text.
	pub fn element(&mut self, name: &str, text: &str) {
		if !text.is_empty() {
			self.element_with(name, &[], text);
		}
	}

	/// The document, newline terminated.
	pub fn finish(self) -> String {
		let mut out = String::from_utf8_lossy(&self.writer.into_inner()).into_owned();
		out.push('\n');
		out
	}
}
