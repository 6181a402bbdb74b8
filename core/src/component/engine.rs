use ibus_serialize::{serializable, Attachments};
use tracing::warn;

use super::{
	error::ParseError,
	xml::{XmlNode, XmlWriter},
};

/// Static description of one input-method engine a component provides.
///
/// Only `name` is required; every other field defaults to empty (or `0` for
/// the rank). The owning component's name is kept alongside but never sent,
/// the receiving side restores it when the component itself is decoded.
#[derive(Debug, Clone, Default)]
pub struct EngineDesc {
	name: String,
	longname: String,
	description: String,
	language: String,
	license: String,
	author: String,
	icon: String,
	layout: String,
	/// Higher ranks win when several engines claim the same language.
	rank: u32,
	hotkeys: String,
	symbol: String,
	setup: String,
	layout_variant: String,
	layout_option: String,
	version: String,
	textdomain: String,
	icon_prop_key: String,
	component: Option<String>,
	attachments: Attachments,
}

serializable!(EngineDesc = "IBusEngineDesc" {
	name,
	longname,
	description,
	language,
	license,
	author,
	icon,
	layout,
	rank,
	hotkeys,
	symbol,
	setup,
	layout_variant,
	layout_option,
	version,
	textdomain,
	icon_prop_key,
});

impl PartialEq for EngineDesc {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
			&& self.longname == other.longname
			&& self.description == other.description
			&& self.language == other.language
			&& self.license == other.license
			&& self.author == other.author
			&& self.icon == other.icon
			&& self.layout == other.layout
			&& self.rank == other.rank
			&& self.hotkeys == other.hotkeys
			&& self.symbol == other.symbol
			&& self.setup == other.setup
			&& self.layout_variant == other.layout_variant
			&& self.layout_option == other.layout_option
			&& self.version == other.version
			&& self.textdomain == other.textdomain
			&& self.icon_prop_key == other.icon_prop_key
			&& self.attachments == other.attachments
	}
}

impl EngineDesc {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Default::default()
		}
	}

	string_fields! {
		name => with_name,
		longname => with_longname,
		description => with_description,
		language => with_language,
		license => with_license,
		author => with_author,
		icon => with_icon,
		layout => with_layout,
		hotkeys => with_hotkeys,
		symbol => with_symbol,
		setup => with_setup,
		layout_variant => with_layout_variant,
		layout_option => with_layout_option,
		version => with_version,
		textdomain => with_textdomain,
		icon_prop_key => with_icon_prop_key,
	}

	#[must_use]
	pub const fn rank(&self) -> u32 {
		self.rank
	}

	#[must_use]
	pub const fn with_rank(mut self, rank: u32) -> Self {
		self.rank = rank;
		self
	}

	/// Name of the component this engine was added to, if any.
	#[must_use]
	pub fn component(&self) -> Option<&str> {
		self.component.as_deref()
	}

	pub(super) fn set_component(&mut self, component: &str) {
		self.component = Some(component.to_owned());
	}

	pub(super) fn from_xml_node(node: &XmlNode) -> Result<Self, ParseError> {
		let mut engine = Self::default();

		for child in &node.children {
			let text = child.text.clone();
			match child.name.as_str() {
				"name" => engine.name = text,
				"longname" => engine.longname = text,
				"description" => engine.description = text,
				"language" => engine.language = text,
				"license" => engine.license = text,
				"author" => engine.author = text,
				"icon" => engine.icon = text,
				"layout" => engine.layout = text,
				"hotkeys" => engine.hotkeys = text,
				"symbol" => engine.symbol = text,
				"setup" => engine.setup = text,
				"layout_variant" => engine.layout_variant = text,
				"layout_option" => engine.layout_option = text,
				"version" => engine.version = text,
				"textdomain" => engine.textdomain = text,
				"icon_prop_key" => engine.icon_prop_key = text,
				"rank" => {
					engine.rank = text.parse().map_err(|_| ParseError::InvalidValue {
						element: "rank".to_string(),
						value: text,
					})?;
				}
				other => warn!(element = other, "Unknown engine description element;"),
			}
		}

		if engine.name.is_empty() {
			return Err(ParseError::InvalidValue {
				element: "engine".to_string(),
				value: "missing <name>".to_string(),
			});
		}

		Ok(engine)
	}

	pub(super) fn write_xml(&self, writer: &mut XmlWriter) {
		writer.open("engine", &[]);
		writer.element("name", &self.name);
		writer.element("longname", &self.longname);
		writer.element("description", &self.description);
		writer.element("language", &self.language);
		writer.element("license", &self.license);
		writer.element("author", &self.author);
		writer.element("icon", &self.icon);
		writer.element("layout", &self.layout);
		writer.element("layout_variant", &self.layout_variant);
		writer.element("layout_option", &self.layout_option);
		writer.element("hotkeys", &self.hotkeys);
		writer.element("rank", &self.rank.to_string());
		writer.element("symbol", &self.symbol);
		writer.element("setup", &self.setup);
		writer.element("version", &self.version);
		writer.element("textdomain", &self.textdomain);
		writer.element("icon_prop_key", &self.icon_prop_key);
		writer.close("engine");
	}

	/// The `<engine>` element a component descriptor lists.
	#[must_use]
	pub fn to_xml(&self) -> String {
		let mut writer = XmlWriter::new();
		self.write_xml(&mut writer);
		writer.finish()
	}
}
