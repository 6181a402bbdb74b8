//! Normalized filesystem events
//!
//! Backends report a zoo of event kinds; consumers here only care whether
//! something was created, changed, removed, had its attributes touched, or
//! was renamed.

use std::{path::PathBuf, time::SystemTime};

use notify::{
	event::{ModifyKind, RenameMode},
	Event, EventKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEventKind {
	Create,
	Modify,
	Remove,
	/// Permissions, ownership or timestamps changed, content didn't.
	Attribute,
	Rename { from: PathBuf },
}

impl FsEventKind {
	#[must_use]
	pub const fn is_create(&self) -> bool {
		matches!(self, Self::Create)
	}

	#[must_use]
	pub const fn is_modify(&self) -> bool {
		matches!(self, Self::Modify)
	}

	#[must_use]
	pub const fn is_remove(&self) -> bool {
		matches!(self, Self::Remove)
	}

	#[must_use]
	pub const fn is_attribute(&self) -> bool {
		matches!(self, Self::Attribute)
	}

	#[must_use]
	pub const fn is_rename(&self) -> bool {
		matches!(self, Self::Rename { .. })
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
	pub kind: FsEventKind,
	pub path: PathBuf,
	pub timestamp: SystemTime,
}

impl FsEvent {
	fn new(kind: FsEventKind, path: PathBuf) -> Self {
		Self {
			kind,
			path,
			timestamp: SystemTime::now(),
		}
	}

	#[must_use]
	pub fn create(path: PathBuf) -> Self {
		Self::new(FsEventKind::Create, path)
	}

	#[must_use]
	pub fn modify(path: PathBuf) -> Self {
		Self::new(FsEventKind::Modify, path)
	}

	#[must_use]
	pub fn remove(path: PathBuf) -> Self {
		Self::new(FsEventKind::Remove, path)
	}

	#[must_use]
	pub fn attribute(path: PathBuf) -> Self {
		Self::new(FsEventKind::Attribute, path)
	}

	#[must_use]
	pub fn rename(from: PathBuf, to: PathBuf) -> Self {
		Self::new(FsEventKind::Rename { from }, to)
	}

	/// Translates a backend event, `None` for kinds nobody here reacts to
	/// (plain reads, opens, closes, unknown).
	#[must_use]
	pub fn from_notify(event: Event) -> Option<Self> {
		let Event { kind, mut paths, .. } = event;

		if paths.is_empty() {
			return None;
		}

		match kind {
			EventKind::Create(_) => Some(Self::create(paths.swap_remove(0))),
			EventKind::Remove(_) => Some(Self::remove(paths.swap_remove(0))),
			EventKind::Modify(ModifyKind::Metadata(_)) => {
				Some(Self::attribute(paths.swap_remove(0)))
			}
			EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
				let to = paths.swap_remove(1);
				Some(Self::rename(paths.swap_remove(0), to))
			}
			EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
				Some(Self::remove(paths.swap_remove(0)))
			}
			EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
				Some(Self::create(paths.swap_remove(0)))
			}
			// Incomplete renames and every other modification count as a change
			EventKind::Modify(_) => Some(Self::modify(paths.swap_remove(0))),
			EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
		}
	}
}
