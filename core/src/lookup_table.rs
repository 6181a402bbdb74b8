//! Candidate window model: a paged list of candidates with a cursor.

use ibus_serialize::{serializable, wire_int_enum, Attachments, DecodeError};
use int_enum::IntEnum;

use crate::text::Text;

pub const MAX_PAGE_SIZE: u32 = 16;
pub const DEFAULT_PAGE_SIZE: u32 = 5;

#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, IntEnum)]
pub enum Orientation {
	Horizontal = 0,
	Vertical = 1,
	/// Whatever the panel is configured for.
	#[default]
	System = 2,
}

wire_int_enum!(Orientation);

/// Candidates shown `page_size` at a time.
///
/// The cursor always points at a candidate when there are any, and the page
/// on screen is the one holding the cursor. With `round` set, moving past
/// either end wraps around instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
	page_size: u32,
	cursor_pos: u32,
	cursor_visible: bool,
	round: bool,
	orientation: Orientation,
	candidates: Vec<Text>,
	labels: Vec<Text>,
	attachments: Attachments,
}

serializable!(LookupTable = "IBusLookupTable" {
	page_size,
	cursor_pos,
	cursor_visible,
	round,
	orientation,
	candidates,
	labels,
} after_decode = LookupTable::check_decoded);

impl Default for LookupTable {
	fn default() -> Self {
		Self::new(DEFAULT_PAGE_SIZE, true, false)
	}
}

const fn clamp_page_size(page_size: u32) -> u32 {
	if page_size == 0 {
		1
	} else if page_size > MAX_PAGE_SIZE {
		MAX_PAGE_SIZE
	} else {
		page_size
	}
}

impl LookupTable {
	/// `page_size` is clamped into `1..=16`. The cursor starts on the first
	/// candidate; move it with [`LookupTable::set_cursor_pos`] once there are
	/// candidates to point at.
	#[must_use]
	pub fn new(page_size: u32, cursor_visible: bool, round: bool) -> Self {
		Self {
			page_size: clamp_page_size(page_size),
			cursor_pos: 0,
			cursor_visible,
			round,
			orientation: Orientation::System,
			candidates: Vec::new(),
			labels: Vec::new(),
			attachments: Attachments::new(),
		}
	}

	fn check_decoded(&mut self) -> Result<(), DecodeError> {
		if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
			return Err(DecodeError::Invariant {
				type_name: "IBusLookupTable",
				reason: format!("page size {} outside 1..={MAX_PAGE_SIZE}", self.page_size),
			});
		}

		if self.candidates.is_empty() {
			// Nothing to point at, a later append must start from the top
			self.cursor_pos = 0;
		} else if self.cursor_pos >= self.count() {
			return Err(DecodeError::Invariant {
				type_name: "IBusLookupTable",
				reason: format!(
					"cursor {} past the last of {} candidates",
					self.cursor_pos,
					self.candidates.len()
				),
			});
		}

		Ok(())
	}

	fn count(&self) -> u32 {
		u32::try_from(self.candidates.len()).unwrap_or(u32::MAX)
	}

	fn last_page_index(&self) -> u32 {
		self.count().saturating_sub(1) / self.page_size
	}

	pub fn append_candidate(&mut self, candidate: impl Into<Text>) {
		self.candidates.push(candidate.into());
	}

	#[must_use]
	pub fn candidate(&self, index: usize) -> Option<&Text> {
		self.candidates.get(index)
	}

	#[must_use]
	pub fn candidates(&self) -> &[Text] {
		&self.candidates
	}

	/// Labels are the selection keys drawn next to each slot of a page.
	pub fn append_label(&mut self, label: impl Into<Text>) {
		self.labels.push(label.into());
	}

	#[must_use]
	pub fn label(&self, index: usize) -> Option<&Text> {
		self.labels.get(index)
	}

	#[must_use]
	pub fn labels(&self) -> &[Text] {
		&self.labels
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	/// Drops every candidate and rewinds the cursor; labels are kept.
	pub fn clear(&mut self) {
		self.candidates.clear();
		self.cursor_pos = 0;
	}

	#[must_use]
	pub const fn page_size(&self) -> u32 {
		self.page_size
	}

	pub fn set_page_size(&mut self, page_size: u32) {
		self.page_size = clamp_page_size(page_size);
	}

	#[must_use]
	pub const fn cursor_pos(&self) -> u32 {
		self.cursor_pos
	}

	/// Fails, leaving the cursor alone, if `pos` isn't a candidate index.
	pub fn set_cursor_pos(&mut self, pos: u32) -> bool {
		if pos >= self.count() {
			return false;
		}

		self.cursor_pos = pos;
		true
	}

	#[must_use]
	pub const fn cursor_in_page(&self) -> u32 {
		self.cursor_pos % self.page_size
	}

	/// Moves the cursor to slot `index` of the page currently shown.
	pub fn set_cursor_pos_in_current_page(&mut self, index: u32) -> bool {
		if index >= self.page_size {
			return false;
		}

		self.set_cursor_pos(self.page_start() + index)
	}

	/// Index of the first candidate on the cursor's page.
	#[must_use]
	pub const fn page_start(&self) -> u32 {
		self.cursor_pos / self.page_size * self.page_size
	}

	/// Candidates on the cursor's page.
	#[must_use]
	pub fn current_page(&self) -> &[Text] {
		let start = (self.page_start() as usize).min(self.candidates.len());
		let end = start
			.saturating_add(self.page_size as usize)
			.min(self.candidates.len());

		&self.candidates[start..end]
	}

	#[must_use]
	pub const fn cursor_visible(&self) -> bool {
		self.cursor_visible
	}

	pub fn set_cursor_visible(&mut self, visible: bool) {
		self.cursor_visible = visible;
	}

	#[must_use]
	pub const fn round(&self) -> bool {
		self.round
	}

	pub fn set_round(&mut self, round: bool) {
		self.round = round;
	}

	#[must_use]
	pub const fn orientation(&self) -> Orientation {
		self.orientation
	}

	pub fn set_orientation(&mut self, orientation: Orientation) {
		self.orientation = orientation;
	}

	pub fn page_up(&mut self) -> bool {
		if self.candidates.is_empty() {
			return false;
		}

		if self.cursor_pos < self.page_size {
			if !self.round {
				return false;
			}

			let last = self.count() - 1;
			self.cursor_pos = (self.last_page_index() * self.page_size + self.cursor_in_page()).min(last);
			return true;
		}

		self.cursor_pos -= self.page_size;
		true
	}

	pub fn page_down(&mut self) -> bool {
		if self.candidates.is_empty() {
			return false;
		}

		if self.cursor_pos / self.page_size == self.last_page_index() {
			if !self.round {
				return false;
			}

			self.cursor_pos = self.cursor_in_page();
			return true;
		}

		let last = self.count() - 1;
		self.cursor_pos = self.cursor_pos.saturating_add(self.page_size).min(last);
		true
	}

	pub fn cursor_up(&mut self) -> bool {
		if self.candidates.is_empty() {
			return false;
		}

		if self.cursor_pos == 0 {
			if !self.round {
				return false;
			}

			self.cursor_pos = self.count() - 1;
			return true;
		}

		self.cursor_pos -= 1;
		true
	}

	pub fn cursor_down(&mut self) -> bool {
		if self.candidates.is_empty() {
			return false;
		}

		if self.cursor_pos >= self.count() - 1 {
			if !self.round {
				return false;
			}

			self.cursor_pos = 0;
			return true;
		}

		self.cursor_pos += 1;
		true
	}
}

#[cfg(test)]
mod tests {
	use ibus_serialize::{Serializable, Value};

	use super::*;

	fn table(count: usize, page_size: u32, round: bool) -> LookupTable {
		let mut table = LookupTable::new(page_size, true, round);
		for i in 0..count {
			table.append_candidate(Text::new(format!("candidate {i}")));
		}
		table
	}

	#[test]
	fn page_size_is_clamped() {
		assert_eq!(LookupTable::new(0, true, false).page_size(), 1);
		assert_eq!(LookupTable::new(40, true, false).page_size(), MAX_PAGE_SIZE);

		let mut table = table(3, 5, false);
		table.set_page_size(17);
		assert_eq!(table.page_size(), MAX_PAGE_SIZE);
	}

	#[test]
	fn round_paging_wraps_both_ways() {
		let mut table = table(7, 3, true);

		assert!(table.page_up());
		assert_eq!(table.cursor_pos(), 6);

		assert!(table.page_down());
		assert_eq!(table.cursor_pos(), 0);

		assert!(table.page_down());
		assert_eq!(table.cursor_pos(), 3);
	}

	#[test]
	fn page_up_onto_short_last_page_clamps() {
		let mut table = table(7, 3, true);
		assert!(table.set_cursor_pos(2));

		assert!(table.page_up());
		assert_eq!(table.cursor_pos(), 6);
	}

	#[test]
	fn page_down_onto_short_last_page_clamps() {
		let mut table = table(7, 3, false);
		assert!(table.set_cursor_pos(5));

		assert!(table.page_down());
		assert_eq!(table.cursor_pos(), 6);
		assert!(!table.page_down());
		assert_eq!(table.cursor_pos(), 6);
	}

	#[test]
	fn boundaries_without_round_fail_untouched() {
		let mut table = table(4, 2, false);

		assert!(!table.cursor_up());
		assert!(!table.page_up());
		assert_eq!(table.cursor_pos(), 0);

		assert!(table.set_cursor_pos(3));
		assert!(!table.cursor_down());
		assert!(!table.page_down());
		assert_eq!(table.cursor_pos(), 3);
	}

	#[test]
	fn empty_table_never_moves() {
		for round in [false, true] {
			let mut table = table(0, 4, round);

			assert!(!table.page_up());
			assert!(!table.page_down());
			assert!(!table.cursor_up());
			assert!(!table.cursor_down());
			assert_eq!(table.cursor_pos(), 0);
		}
	}

	#[test]
	fn cursor_down_len_times_comes_back() {
		for count in [1, 2, 7, 16] {
			for start in 0..count {
				let mut table = table(count as usize, 3, true);
				assert!(table.set_cursor_pos(start));

				for _ in 0..count {
					assert!(table.cursor_down());
				}
				assert_eq!(table.cursor_pos(), start);

				for _ in 0..count {
					assert!(table.cursor_up());
				}
				assert_eq!(table.cursor_pos(), start);
			}
		}
	}

	#[test]
	fn current_page_follows_the_cursor() {
		let mut table = table(7, 3, false);
		assert_eq!(table.current_page().len(), 3);

		assert!(table.set_cursor_pos(6));
		assert_eq!(table.page_start(), 6);
		assert_eq!(table.current_page().len(), 1);
		assert_eq!(table.current_page()[0].content(), "candidate 6");

		assert!(table.set_cursor_pos(4));
		assert_eq!(table.cursor_in_page(), 1);
		assert!(table.set_cursor_pos_in_current_page(2));
		assert_eq!(table.cursor_pos(), 5);
		assert!(!table.set_cursor_pos_in_current_page(3));
	}

	#[test]
	fn set_cursor_pos_rejects_out_of_range() {
		let mut table = table(2, 3, false);

		assert!(!table.set_cursor_pos(2));
		assert_eq!(table.cursor_pos(), 0);
	}

	#[test]
	fn clear_keeps_labels() {
		let mut table = table(5, 3, false);
		table.append_label("1.");
		assert!(table.set_cursor_pos(4));

		table.clear();

		assert!(table.is_empty());
		assert_eq!(table.cursor_pos(), 0);
		assert_eq!(table.label(0).unwrap().content(), "1.");
	}

	#[test]
	fn round_trip() {
		let mut table = table(4, 2, true);
		table.append_label("a");
		table.set_orientation(Orientation::Vertical);
		assert!(table.set_cursor_pos(3));

		assert_eq!(LookupTable::deserialize(&table.serialize()).unwrap(), table);
	}

	fn wire(page_size: u32, cursor_pos: u32, candidates: usize) -> Value {
		let candidates = (0..candidates)
			.map(|i| Text::new(i.to_string()).to_wire())
			.collect();

		Value::Array(vec![
			Value::from("IBusLookupTable"),
			Value::from(page_size),
			Value::from(cursor_pos),
			Value::Boolean(true),
			Value::Boolean(false),
			Value::from(2u32),
			Value::Array(candidates),
			Value::Array(vec![]),
			Value::Map(vec![]),
		])
	}

	#[test]
	fn decode_rejects_broken_invariants() {
		assert!(LookupTable::from_wire(wire(3, 1, 2)).is_ok());

		assert!(matches!(
			LookupTable::from_wire(wire(0, 0, 2)),
			Err(DecodeError::Invariant { .. })
		));
		assert!(matches!(
			LookupTable::from_wire(wire(17, 0, 2)),
			Err(DecodeError::Invariant { .. })
		));
		assert!(matches!(
			LookupTable::from_wire(wire(3, 2, 2)),
			Err(DecodeError::Invariant { .. })
		));
	}

	#[test]
	fn appending_keeps_the_cursor_on_a_candidate() {
		let mut table = LookupTable::new(5, true, false);
		assert!(!table.set_cursor_pos(3));

		table.append_candidate("あ");
		assert_eq!(table.cursor_pos(), 0);
		assert_eq!(LookupTable::deserialize(&table.serialize()).unwrap(), table);

		for candidate in ["い", "う", "え"] {
			table.append_candidate(candidate);
		}
		assert!(table.set_cursor_pos(3));
		assert_eq!(LookupTable::deserialize(&table.serialize()).unwrap(), table);
	}

	#[test]
	fn cursor_down_from_any_reachable_position() {
		for round in [false, true] {
			let mut table = table(3, 2, round);
			assert!(table.set_cursor_pos(2));

			assert_eq!(table.cursor_down(), round);
			assert_eq!(table.cursor_pos(), if round { 0 } else { 2 });
		}

		// A decoded empty table with a stale cursor starts over
		let mut empty = LookupTable::from_wire(wire(5, u32::MAX, 0)).unwrap();
		assert_eq!(empty.cursor_pos(), 0);
		empty.append_candidate("x");
		assert!(!empty.cursor_down());
		assert_eq!(empty.cursor_pos(), 0);
	}
}
