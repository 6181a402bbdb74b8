use std::vec;

use rmpv::Value;

use crate::{codec, error::kind_of, Attachments, DecodeError};

/// An object that flattens into a self-describing tuple and back.
///
/// The tuple is `[type_name, field_1, .., field_n, attachments]`. Field order
/// is append-only: a field may only ever be added right before the attachment
/// map, never moved or removed, or every existing cache and every older peer
/// stops understanding us. Readers take attachments from the last slot and
/// ignore fields they don't know, so newer writers stay readable.
///
/// Don't implement this by hand, use [`serializable!`](crate::serializable) so
/// that both directions come from one field list.
pub trait Serializable: Sized {
	/// Registered wire name, the first slot of every tuple.
	const TYPE_NAME: &'static str;

	fn attachments(&self) -> &Attachments;

	fn attachments_mut(&mut self) -> &mut Attachments;

	fn encode_fields(&self, fields: &mut Vec<Value>);

	fn decode_fields(fields: &mut Fields) -> Result<Self, DecodeError>;

	/// Runs once all fields and attachments are in place; checks invariants
	/// and restores state that isn't on the wire.
	fn after_decode(&mut self) -> Result<(), DecodeError> {
		Ok(())
	}

	fn to_wire(&self) -> Value {
		let mut tuple = vec![Value::from(Self::TYPE_NAME)];
		self.encode_fields(&mut tuple);
		tuple.push(self.attachments().to_wire());
		Value::Array(tuple)
	}

	fn from_wire(value: Value) -> Result<Self, DecodeError> {
		let tuple = Tuple::open(value)?;
		if tuple.type_name() != Self::TYPE_NAME {
			return Err(DecodeError::TypeMismatch {
				expected: Self::TYPE_NAME,
				found: tuple.type_name,
			});
		}

		Self::from_tuple(tuple)
	}

	/// Finishes decoding an already opened tuple whose type name has been
	/// matched against [`Serializable::TYPE_NAME`].
	fn from_tuple(tuple: Tuple) -> Result<Self, DecodeError> {
		let Tuple {
			fields,
			attachments,
			..
		} = tuple;

		let mut fields = Fields {
			type_name: Self::TYPE_NAME,
			values: fields.into_iter(),
		};

		let mut object = Self::decode_fields(&mut fields)?;
		*object.attachments_mut() = attachments;
		object.after_decode()?;

		Ok(object)
	}

	/// Encodes to bytes, see [`codec::to_bytes`].
	#[must_use]
	fn serialize(&self) -> Vec<u8> {
		codec::to_bytes(&self.to_wire())
	}

	fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
		Self::from_wire(codec::from_bytes(bytes)?)
	}
}

/// An object tuple whose framing has been checked but whose fields are still raw.
#[derive(Debug)]
pub struct Tuple {
	type_name: String,
	fields: Vec<Value>,
	attachments: Attachments,
}

impl Tuple {
	/// Checks the `[type_name, .., attachments]` shape.
	pub fn open(value: Value) -> Result<Self, DecodeError> {
		let Value::Array(mut items) = value else {
			return Err(DecodeError::NotATuple(kind_of(&value)));
		};

		if items.len() < 2 {
			return Err(DecodeError::NotATuple("array shorter than two slots"));
		}

		let attachments = items.pop().map_or_else(
			|| Ok(Attachments::new()),
			Attachments::from_wire,
		)?;

		let mut items = items.into_iter();
		let type_name = match items.next() {
			Some(Value::String(name)) => name.into_str().ok_or(DecodeError::UnexpectedKind {
				field: "type_name",
				expected: "UTF-8 string",
			})?,
			_ => {
				return Err(DecodeError::UnexpectedKind {
					field: "type_name",
					expected: "string",
				})
			}
		};

		Ok(Self {
			type_name,
			fields: items.collect(),
			attachments,
		})
	}

	#[must_use]
	pub fn type_name(&self) -> &str {
		&self.type_name
	}

	#[must_use]
	pub fn into_type_name(self) -> String {
		self.type_name
	}
}

/// Cursor over the field slots of a tuple, handed to
/// [`Serializable::decode_fields`].
#[derive(Debug)]
pub struct Fields {
	type_name: &'static str,
	values: vec::IntoIter<Value>,
}

impl Fields {
	/// Decodes the next slot, failing if the tuple ran out.
	pub fn next<T: crate::Wire>(&mut self, field: &'static str) -> Result<T, DecodeError> {
		let value = self.values.next().ok_or(DecodeError::Truncated {
			type_name: self.type_name,
			field,
		})?;

		T::from_wire(value, field)
	}
}

/// Implements [`Serializable`] and [`Wire`](crate::Wire) for a struct from a
/// single ordered field list.
///
/// The struct must implement `Default` and have an `attachments: Attachments`
/// field. Fields not listed are left at their default on decode, which is how
/// transient state stays off the wire. An optional `after_decode = path` hook
/// receives `&mut Self` once decoding is done.
///
/// ```
/// use ibus_serialize::{serializable, Attachments, Serializable};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Greeting {
/// 	text: String,
/// 	times: u32,
/// 	attachments: Attachments,
/// }
///
/// serializable!(Greeting = "Greeting" { text, times });
///
/// let hello = Greeting { text: "hello".into(), times: 2, ..Default::default() };
/// assert_eq!(Greeting::deserialize(&hello.serialize()).unwrap(), hello);
/// ```
#[macro_export]
macro_rules! serializable {
	(
		$ty:ident = $name:literal { $($field:ident),* $(,)? }
		$(after_decode = $hook:path)?
	) => {
		impl $crate::Serializable for $ty {
			const TYPE_NAME: &'static str = $name;

			fn attachments(&self) -> &$crate::Attachments {
				&self.attachments
			}

			fn attachments_mut(&mut self) -> &mut $crate::Attachments {
				&mut self.attachments
			}

			fn encode_fields(&self, fields: &mut ::std::vec::Vec<$crate::Value>) {
				$(fields.push($crate::Wire::to_wire(&self.$field));)*
			}

			fn decode_fields(
				fields: &mut $crate::Fields,
			) -> ::std::result::Result<Self, $crate::DecodeError> {
				#[allow(unused_mut)]
				let mut object = <Self as ::std::default::Default>::default();
				$(object.$field = fields.next(stringify!($field))?;)*
				Ok(object)
			}

			$(
				fn after_decode(&mut self) -> ::std::result::Result<(), $crate::DecodeError> {
					$hook(self)
				}
			)?
		}

		impl $crate::Wire for $ty {
			fn to_wire(&self) -> $crate::Value {
				<Self as $crate::Serializable>::to_wire(self)
			}

			fn from_wire(
				value: $crate::Value,
				_field: &'static str,
			) -> ::std::result::Result<Self, $crate::DecodeError> {
				<Self as $crate::Serializable>::from_wire(value)
			}
		}
	};
}

#[cfg(test)]
mod tests {
	use int_enum::IntEnum;

	use super::*;
	use crate::{serializable, wire_int_enum};

	#[repr(u32)]
	#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, IntEnum)]
	enum Shape {
		#[default]
		Round = 0,
		Square = 1,
	}

	wire_int_enum!(Shape);

	#[derive(Debug, Default, PartialEq)]
	struct Leaf {
		label: String,
		shape: Shape,
		attachments: Attachments,
	}

	serializable!(Leaf = "TestLeaf" { label, shape });

	#[derive(Debug, Default, PartialEq)]
	struct Branch {
		weight: u32,
		leaves: Vec<Leaf>,
		scratch: u32,
		attachments: Attachments,
	}

	serializable!(Branch = "TestBranch" { weight, leaves });

	fn leaf(label: &str) -> Leaf {
		Leaf {
			label: label.to_string(),
			shape: Shape::Square,
			attachments: Attachments::new(),
		}
	}

	#[test]
	fn tuple_layout_is_name_fields_attachments() {
		let mut leaf = leaf("a");
		leaf.attachments.set("k", true);

		assert_eq!(
			leaf.to_wire(),
			Value::Array(vec![
				Value::from("TestLeaf"),
				Value::from("a"),
				Value::from(1u32),
				Value::Map(vec![(Value::from("k"), Value::Boolean(true))]),
			])
		);
	}

	#[test]
	fn nested_round_trip_keeps_attachments_at_every_level() {
		let mut inner = leaf("inner");
		inner.attachments.set("depth", 2u32);

		let mut branch = Branch {
			weight: 9,
			leaves: vec![leaf("first"), inner],
			..Default::default()
		};
		branch.attachments.set_object("pinned", &leaf("pinned"));

		let decoded = Branch::deserialize(&branch.serialize()).unwrap();

		assert_eq!(decoded, branch);
		assert_eq!(
			decoded.attachments.object::<Leaf>("pinned").unwrap().unwrap(),
			leaf("pinned")
		);
	}

	#[test]
	fn unlisted_fields_stay_off_the_wire() {
		let branch = Branch {
			weight: 1,
			scratch: 77,
			..Default::default()
		};

		assert_eq!(Branch::deserialize(&branch.serialize()).unwrap().scratch, 0);
	}

	#[test]
	fn short_tuple_is_rejected() {
		let wire = Value::Array(vec![
			Value::from("TestLeaf"),
			Value::from("only label"),
			Value::Map(vec![]),
		]);

		assert!(matches!(
			Leaf::from_wire(wire),
			Err(DecodeError::Truncated {
				type_name: "TestLeaf",
				field: "shape"
			})
		));
	}

	#[test]
	fn fields_appended_by_newer_writers_are_ignored() {
		let wire = Value::Array(vec![
			Value::from("TestLeaf"),
			Value::from("x"),
			Value::from(0u32),
			Value::from("field from the future"),
			Value::Map(vec![(Value::from("kept"), Value::from(1u32))]),
		]);

		let leaf = Leaf::from_wire(wire).unwrap();
		assert_eq!(leaf.label, "x");
		assert_eq!(leaf.attachments.get("kept"), Some(&Value::from(1u32)));
	}

	#[test]
	fn wrong_type_name_is_rejected() {
		let bytes = leaf("a").serialize();

		assert!(matches!(
			Branch::deserialize(&bytes),
			Err(DecodeError::TypeMismatch {
				expected: "TestBranch",
				..
			})
		));
	}

	#[test]
	fn invalid_discriminant_is_rejected() {
		let wire = Value::Array(vec![
			Value::from("TestLeaf"),
			Value::from("x"),
			Value::from(42u32),
			Value::Map(vec![]),
		]);

		assert!(matches!(
			Leaf::from_wire(wire),
			Err(DecodeError::InvalidValue { field: "shape", .. })
		));
	}

	#[test]
	fn non_tuples_are_rejected() {
		assert!(matches!(
			Tuple::open(Value::from(3u32)),
			Err(DecodeError::NotATuple("integer"))
		));
		assert!(matches!(
			Tuple::open(Value::Array(vec![Value::from("TestLeaf")])),
			Err(DecodeError::NotATuple(_))
		));
	}
}
