use std::collections::{btree_map, BTreeMap};

use rmpv::Value;

use crate::{error::kind_of, DecodeError, Serializable};

/// Out-of-band key/value pairs carried by every serializable object.
///
/// Consumers that don't know a key still carry it through a decode/encode cycle
/// untouched. Values are arbitrary wire values; a nested object is stored as
/// its own tuple (see [`Attachments::set_object`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachments(BTreeMap<String, Value>);

impl Attachments {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces the value under `key`, returning the previous one.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(key.into(), value.into())
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.0.remove(key)
	}

	#[must_use]
	pub fn contains(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
		self.0.iter()
	}

	/// Attaches a whole object, encoded as its self-describing tuple.
	pub fn set_object<T: Serializable>(&mut self, key: impl Into<String>, object: &T) -> Option<Value> {
		self.set(key, object.to_wire())
	}

	/// Reads back an object stored with [`Attachments::set_object`].
	///
	/// `None` if the key is absent, an error if the value isn't a `T`.
	pub fn object<T: Serializable>(&self, key: &str) -> Option<Result<T, DecodeError>> {
		self.get(key).map(|value| T::from_wire(value.clone()))
	}

	pub(crate) fn to_wire(&self) -> Value {
		Value::Map(
			self.0
				.iter()
				.map(|(key, value)| (Value::from(key.as_str()), value.clone()))
				.collect(),
		)
	}

	pub(crate) fn from_wire(value: Value) -> Result<Self, DecodeError> {
		let Value::Map(entries) = value else {
			return Err(DecodeError::UnexpectedKind {
				field: "attachments",
				expected: "map",
			});
		};

		entries
			.into_iter()
			.map(|(key, value)| match key {
				Value::String(key) => key
					.into_str()
					.map(|key| (key, value))
					.ok_or(DecodeError::UnexpectedKind {
						field: "attachments",
						expected: "UTF-8 key",
					}),
				other => Err(DecodeError::InvalidValue {
					field: "attachments",
					value: format!("{} key", kind_of(&other)),
				}),
			})
			.collect::<Result<_, _>>()
			.map(Self)
	}
}

impl<'a> IntoIterator for &'a Attachments {
	type Item = (&'a String, &'a Value);
	type IntoIter = btree_map::Iter<'a, String, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
