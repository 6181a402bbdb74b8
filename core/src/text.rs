//! Styled text: a string plus the attribute runs a renderer applies to it.
//!
//! Attribute indices count Unicode code points, not bytes, so that every peer
//! on the bus agrees on them regardless of its own string representation.

use std::{borrow::Cow, fmt, ops::Range};

use ibus_serialize::{serializable, wire_int_enum, Attachments};
use int_enum::IntEnum;

#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, IntEnum)]
pub enum AttrType {
	#[default]
	Underline = 1,
	Foreground = 2,
	Background = 3,
}

/// Values of an [`AttrType::Underline`] attribute.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, IntEnum)]
pub enum UnderlineKind {
	#[default]
	None = 0,
	Single = 1,
	Double = 2,
	Low = 3,
	Error = 4,
}

wire_int_enum!(AttrType, UnderlineKind);

/// One styling run over the code points `start_index..end_index`.
///
/// For colors the value is `0xRRGGBB`, for underlines an [`UnderlineKind`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribute {
	attr_type: AttrType,
	value: u32,
	start_index: u32,
	end_index: u32,
	attachments: Attachments,
}

serializable!(Attribute = "IBusAttribute" { attr_type, value, start_index, end_index });

impl Attribute {
	#[must_use]
	pub fn new(attr_type: AttrType, value: u32, start_index: u32, end_index: u32) -> Self {
		Self {
			attr_type,
			value,
			start_index,
			end_index,
			attachments: Attachments::new(),
		}
	}

	#[must_use]
	pub fn underline(kind: UnderlineKind, start_index: u32, end_index: u32) -> Self {
		Self::new(AttrType::Underline, kind.into(), start_index, end_index)
	}

	#[must_use]
	pub fn foreground(color: u32, start_index: u32, end_index: u32) -> Self {
		Self::new(AttrType::Foreground, color, start_index, end_index)
	}

	#[must_use]
	pub fn background(color: u32, start_index: u32, end_index: u32) -> Self {
		Self::new(AttrType::Background, color, start_index, end_index)
	}

	#[must_use]
	pub const fn attr_type(&self) -> AttrType {
		self.attr_type
	}

	#[must_use]
	pub const fn value(&self) -> u32 {
		self.value
	}

	#[must_use]
	pub const fn start_index(&self) -> u32 {
		self.start_index
	}

	#[must_use]
	pub const fn end_index(&self) -> u32 {
		self.end_index
	}

	#[must_use]
	pub const fn range(&self) -> Range<u32> {
		self.start_index..self.end_index
	}

	#[must_use]
	pub const fn covers(&self, index: u32) -> bool {
		self.start_index <= index && index < self.end_index
	}
}

/// Ordered attribute runs. Runs may overlap; order is preserved as appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrList {
	attributes: Vec<Attribute>,
	attachments: Attachments,
}

serializable!(AttrList = "IBusAttrList" { attributes });

impl AttrList {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn append(&mut self, attribute: Attribute) {
		self.attributes.push(attribute);
	}

	#[must_use]
	pub fn get(&self, index: usize) -> Option<&Attribute> {
		self.attributes.get(index)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.attributes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.attributes.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
		self.attributes.iter()
	}

	/// Every run a renderer has to apply at code point `index`.
	pub fn covering(&self, index: u32) -> impl Iterator<Item = &Attribute> {
		self.attributes.iter().filter(move |attr| attr.covers(index))
	}
}

impl FromIterator<Attribute> for AttrList {
	fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
		Self {
			attributes: iter.into_iter().collect(),
			attachments: Attachments::new(),
		}
	}
}

impl<'a> IntoIterator for &'a AttrList {
	type Item = &'a Attribute;
	type IntoIter = std::slice::Iter<'a, Attribute>;

	fn into_iter(self) -> Self::IntoIter {
		self.attributes.iter()
	}
}

/// A string with optional styling.
///
/// Text built from a `&'static str` borrows it instead of copying; a decoded
/// text always owns its content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Text {
	content: Cow<'static, str>,
	attributes: AttrList,
	attachments: Attachments,
}

serializable!(Text = "IBusText" { content, attributes });

impl Text {
	#[must_use]
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			content: Cow::Owned(content.into()),
			..Default::default()
		}
	}

	#[must_use]
	pub fn from_static(content: &'static str) -> Self {
		Self {
			content: Cow::Borrowed(content),
			..Default::default()
		}
	}

	#[must_use]
	pub fn from_char(c: char) -> Self {
		Self::new(c)
	}

	#[must_use]
	pub fn content(&self) -> &str {
		&self.content
	}

	/// Whether the content borrows a `'static` string rather than owning a copy.
	#[must_use]
	pub const fn is_static(&self) -> bool {
		matches!(self.content, Cow::Borrowed(_))
	}

	/// Length in code points, the unit attribute indices use.
	#[must_use]
	pub fn len(&self) -> usize {
		self.content.chars().count()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.content.is_empty()
	}

	#[must_use]
	pub const fn attributes(&self) -> &AttrList {
		&self.attributes
	}

	pub fn set_attributes(&mut self, attributes: AttrList) {
		self.attributes = attributes;
	}

	#[must_use]
	pub fn with_attributes(mut self, attributes: AttrList) -> Self {
		self.attributes = attributes;
		self
	}

	/// Appends a run, counting a negative `end_index` back from the end of the
	/// content, so `-1` means "up to the last code point inclusive".
	///
	/// Empty or inverted runs are dropped; returns whether the run was kept.
	pub fn append_attribute(
		&mut self,
		attr_type: AttrType,
		value: u32,
		start_index: u32,
		end_index: i32,
	) -> bool {
		let mut end = i64::from(end_index);
		if end < 0 {
			end += i64::try_from(self.len()).unwrap_or(i64::MAX) + 1;
		}

		let Ok(end) = u32::try_from(end) else {
			return false;
		};

		if end <= start_index {
			return false;
		}

		self.attributes
			.append(Attribute::new(attr_type, value, start_index, end));

		true
	}
}

impl fmt::Display for Text {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.content)
	}
}

impl From<&'static str> for Text {
	fn from(content: &'static str) -> Self {
		Self::from_static(content)
	}
}

impl From<String> for Text {
	fn from(content: String) -> Self {
		Self::new(content)
	}
}

#[cfg(test)]
mod tests {
	use ibus_serialize::{DecodeError, Serializable, Value};

	use super::*;

	#[test]
	fn negative_end_counts_from_the_end_in_code_points() {
		let mut text = Text::new("héllo");
		assert_eq!(text.len(), 5);

		assert!(text.append_attribute(AttrType::Underline, UnderlineKind::Single.into(), 1, -1));
		assert_eq!(text.attributes().get(0).unwrap().range(), 1..5);

		assert!(text.append_attribute(AttrType::Foreground, 0x00ff_0000, 0, -3));
		assert_eq!(text.attributes().get(1).unwrap().range(), 0..3);
	}

	#[test]
	fn empty_and_inverted_runs_are_dropped() {
		let mut text = Text::new("abc");

		assert!(!text.append_attribute(AttrType::Background, 0, 2, 2));
		assert!(!text.append_attribute(AttrType::Background, 0, 3, 1));
		assert!(!text.append_attribute(AttrType::Background, 0, 0, -4));
		assert!(!text.append_attribute(AttrType::Background, 0, 0, -10));
		assert!(text.attributes().is_empty());
	}

	#[test]
	fn static_text_borrows_until_decoded() {
		let text = Text::from_static("ni hao");
		assert!(text.is_static());
		assert!(!Text::new("ni hao").is_static());

		let decoded = Text::deserialize(&text.serialize()).unwrap();
		assert!(!decoded.is_static());
		assert_eq!(decoded, text);
	}

	#[test]
	fn round_trip_keeps_runs_and_attachments() {
		let mut text = Text::new("日本語");
		text.append_attribute(AttrType::Underline, UnderlineKind::Double.into(), 0, -1);
		text.attachments_mut().set("emoji", false);

		let decoded = Text::deserialize(&text.serialize()).unwrap();

		assert_eq!(decoded, text);
		assert_eq!(decoded.attachments().get("emoji"), Some(&Value::Boolean(false)));
	}

	#[test]
	fn covering_finds_overlapping_runs() {
		let list: AttrList = [
			Attribute::underline(UnderlineKind::Single, 0, 4),
			Attribute::foreground(0x0000_00ff, 2, 3),
			Attribute::background(0x00ff_ffff, 5, 6),
		]
		.into_iter()
		.collect();

		assert_eq!(list.covering(2).count(), 2);
		assert_eq!(list.covering(4).count(), 0);
		assert_eq!(list.covering(5).next().unwrap().attr_type(), AttrType::Background);
	}

	#[test]
	fn unknown_attribute_type_is_rejected() {
		let wire = Value::Array(vec![
			Value::from("IBusAttribute"),
			Value::from(9u32),
			Value::from(0u32),
			Value::from(0u32),
			Value::from(1u32),
			Value::Map(vec![]),
		]);

		assert!(matches!(
			Attribute::from_wire(wire),
			Err(DecodeError::InvalidValue {
				field: "attr_type",
				..
			})
		));
	}
}
