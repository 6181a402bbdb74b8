//! Panel properties: the menu entries, toggles, and radio items an engine
//! exposes, nested into trees through sub-property lists.

use ibus_serialize::{serializable, wire_int_enum, Attachments};
use int_enum::IntEnum;

use crate::text::Text;

#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, IntEnum)]
pub enum PropType {
	#[default]
	Normal = 0,
	Toggle = 1,
	Radio = 2,
	Menu = 3,
	Separator = 4,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, IntEnum)]
pub enum PropState {
	#[default]
	Unchecked = 0,
	Checked = 1,
	Inconsistent = 2,
}

wire_int_enum!(PropType, PropState);

/// One panel item, addressed by its `key`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Property {
	key: String,
	prop_type: PropType,
	label: Text,
	icon: String,
	tooltip: Text,
	sensitive: bool,
	visible: bool,
	state: PropState,
	sub_props: PropList,
	symbol: Text,
	attachments: Attachments,
}

serializable!(Property = "IBusProperty" {
	key,
	prop_type,
	label,
	icon,
	tooltip,
	sensitive,
	visible,
	state,
	sub_props,
	symbol,
});

impl Property {
	/// A sensitive, visible, unchecked property with empty texts.
	#[must_use]
	pub fn new(key: impl Into<String>, prop_type: PropType) -> Self {
		Self {
			key: key.into(),
			prop_type,
			sensitive: true,
			visible: true,
			..Default::default()
		}
	}

	#[must_use]
	pub fn with_label(mut self, label: impl Into<Text>) -> Self {
		self.label = label.into();
		self
	}

	#[must_use]
	pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
		self.icon = icon.into();
		self
	}

	#[must_use]
	pub fn with_tooltip(mut self, tooltip: impl Into<Text>) -> Self {
		self.tooltip = tooltip.into();
		self
	}

	#[must_use]
	pub const fn with_sensitive(mut self, sensitive: bool) -> Self {
		self.sensitive = sensitive;
		self
	}

	#[must_use]
	pub const fn with_visible(mut self, visible: bool) -> Self {
		self.visible = visible;
		self
	}

	#[must_use]
	pub const fn with_state(mut self, state: PropState) -> Self {
		self.state = state;
		self
	}

	#[must_use]
	pub fn with_sub_props(mut self, sub_props: PropList) -> Self {
		self.sub_props = sub_props;
		self
	}

	#[must_use]
	pub fn with_symbol(mut self, symbol: impl Into<Text>) -> Self {
		self.symbol = symbol.into();
		self
	}

	#[must_use]
	pub fn key(&self) -> &str {
		&self.key
	}

	#[must_use]
	pub const fn prop_type(&self) -> PropType {
		self.prop_type
	}

	#[must_use]
	pub const fn label(&self) -> &Text {
		&self.label
	}

	pub fn set_label(&mut self, label: impl Into<Text>) {
		self.label = label.into();
	}

	#[must_use]
	pub fn icon(&self) -> &str {
		&self.icon
	}

	pub fn set_icon(&mut self, icon: impl Into<String>) {
		self.icon = icon.into();
	}

	#[must_use]
	pub const fn tooltip(&self) -> &Text {
		&self.tooltip
	}

	pub fn set_tooltip(&mut self, tooltip: impl Into<Text>) {
		self.tooltip = tooltip.into();
	}

	#[must_use]
	pub const fn sensitive(&self) -> bool {
		self.sensitive
	}

	pub fn set_sensitive(&mut self, sensitive: bool) {
		self.sensitive = sensitive;
	}

	#[must_use]
	pub const fn visible(&self) -> bool {
		self.visible
	}

	pub fn set_visible(&mut self, visible: bool) {
		self.visible = visible;
	}

	#[must_use]
	pub const fn state(&self) -> PropState {
		self.state
	}

	pub fn set_state(&mut self, state: PropState) {
		self.state = state;
	}

	#[must_use]
	pub const fn sub_props(&self) -> &PropList {
		&self.sub_props
	}

	pub fn sub_props_mut(&mut self) -> &mut PropList {
		&mut self.sub_props
	}

	#[must_use]
	pub const fn symbol(&self) -> &Text {
		&self.symbol
	}

	pub fn set_symbol(&mut self, symbol: impl Into<Text>) {
		self.symbol = symbol.into();
	}

	/// Copies the mutable presentation of `updated` onto this property.
	///
	/// Key, type, and sub-properties stay as they are.
	fn apply(&mut self, updated: &Self) {
		self.label = updated.label.clone();
		self.icon.clone_from(&updated.icon);
		self.tooltip = updated.tooltip.clone();
		self.sensitive = updated.sensitive;
		self.visible = updated.visible;
		self.state = updated.state;
		self.symbol = updated.symbol.clone();
	}

	/// Applies `updated` to this property if the keys match, otherwise to the
	/// first matching property in the subtree.
	pub fn update(&mut self, updated: &Self) -> bool {
		if self.key == updated.key {
			self.apply(updated);
			return true;
		}

		self.sub_props.update_property(updated)
	}
}

/// Ordered properties of one menu level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropList {
	properties: Vec<Property>,
	attachments: Attachments,
}

serializable!(PropList = "IBusPropList" { properties });

impl PropList {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn append(&mut self, property: Property) {
		self.properties.push(property);
	}

	#[must_use]
	pub fn get(&self, index: usize) -> Option<&Property> {
		self.properties.get(index)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.properties.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.properties.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Property> {
		self.properties.iter()
	}

	/// First property with `key`, searching this level before descending.
	#[must_use]
	pub fn find(&self, key: &str) -> Option<&Property> {
		self.properties
			.iter()
			.find(|prop| prop.key == key)
			.or_else(|| self.properties.iter().find_map(|prop| prop.sub_props.find(key)))
	}

	/// Overwrites the presentation of the first property sharing the key of
	/// `updated`: this level is checked before any sub-list, and sub-lists are
	/// searched depth-first left to right.
	///
	/// Returns whether anything matched.
	pub fn update_property(&mut self, updated: &Property) -> bool {
		if let Some(prop) = self.properties.iter_mut().find(|prop| prop.key == updated.key) {
			prop.apply(updated);
			return true;
		}

		self.properties
			.iter_mut()
			.any(|prop| prop.sub_props.update_property(updated))
	}
}

impl FromIterator<Property> for PropList {
	fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
		Self {
			properties: iter.into_iter().collect(),
			attachments: Attachments::new(),
		}
	}
}

impl<'a> IntoIterator for &'a PropList {
	type Item = &'a Property;
	type IntoIter = std::slice::Iter<'a, Property>;

	fn into_iter(self) -> Self::IntoIter {
		self.properties.iter()
	}
}

#[cfg(test)]
mod tests {
	use ibus_serialize::Serializable;

	use super::*;

	fn input_mode_menu() -> PropList {
		let modes: PropList = [
			Property::new("InputMode.Hiragana", PropType::Radio)
				.with_label("Hiragana")
				.with_state(PropState::Checked),
			Property::new("InputMode.Katakana", PropType::Radio).with_label("Katakana"),
		]
		.into_iter()
		.collect();

		[
			Property::new("InputMode", PropType::Menu)
				.with_label("Input Mode")
				.with_symbol("あ")
				.with_sub_props(modes),
			Property::new("setup", PropType::Normal).with_icon("gtk-preferences"),
		]
		.into_iter()
		.collect()
	}

	#[test]
	fn update_reaches_nested_property() {
		let mut props = input_mode_menu();

		let updated = Property::new("InputMode.Katakana", PropType::Normal)
			.with_label("カタカナ")
			.with_state(PropState::Checked)
			.with_sensitive(false);

		assert!(props.update_property(&updated));

		let katakana = props.find("InputMode.Katakana").unwrap();
		assert_eq!(katakana.label().content(), "カタカナ");
		assert_eq!(katakana.state(), PropState::Checked);
		assert!(!katakana.sensitive());
		// Type is not part of the update
		assert_eq!(katakana.prop_type(), PropType::Radio);
	}

	#[test]
	fn update_prefers_the_shallower_match() {
		let nested = [Property::new("dup", PropType::Normal).with_label("nested")]
			.into_iter()
			.collect();

		let mut props: PropList = [
			Property::new("menu", PropType::Menu).with_sub_props(nested),
			Property::new("dup", PropType::Normal).with_label("top"),
		]
		.into_iter()
		.collect();

		assert!(props.update_property(&Property::new("dup", PropType::Normal).with_label("new")));

		assert_eq!(props.get(1).unwrap().label().content(), "new");
		assert_eq!(
			props.get(0).unwrap().sub_props().get(0).unwrap().label().content(),
			"nested"
		);
	}

	#[test]
	fn update_with_unknown_key_changes_nothing() {
		let mut props = input_mode_menu();
		let before = props.clone();

		assert!(!props.update_property(&Property::new("missing", PropType::Toggle)));
		assert_eq!(props, before);
	}

	#[test]
	fn property_update_keeps_its_own_sub_props() {
		let mut menu = input_mode_menu().get(0).unwrap().clone();

		assert!(menu.update(&Property::new("InputMode", PropType::Menu).with_label("Mode")));
		assert_eq!(menu.label().content(), "Mode");
		assert_eq!(menu.sub_props().len(), 2);
	}

	#[test]
	fn nested_round_trip() {
		let mut props = input_mode_menu();
		props.attachments_mut().set("panel", "compact");

		assert_eq!(PropList::deserialize(&props.serialize()).unwrap(), props);
	}
}
