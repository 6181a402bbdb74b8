//! Decoding without knowing the type up front.
//!
//! Every serialized object starts with its type name, so a receiver can turn
//! bytes into an [`Object`] and only then decide what to do with it.

use ibus_serialize::{codec, Attachments, DecodeError, Serializable, Tuple, Value};

use crate::{
	component::{Component, EngineDesc, ObservedPath},
	lookup_table::LookupTable,
	property::{PropList, Property},
	registry::Registry,
	text::{AttrList, Attribute, Text},
};

macro_rules! objects {
	($($variant:ident),+ $(,)?) => {
		/// Any of the types known to the bus.
		#[derive(Debug, Clone, PartialEq)]
		pub enum Object {
			$($variant($variant),)+
		}

		impl Object {
			/// Type names this enum can decode, in declaration order.
			pub const TYPE_NAMES: &'static [&'static str] = &[
				$(<$variant as Serializable>::TYPE_NAME,)+
			];

			#[must_use]
			pub const fn type_name(&self) -> &'static str {
				match self {
					$(Self::$variant(_) => <$variant as Serializable>::TYPE_NAME,)+
				}
			}

			#[must_use]
			pub fn to_wire(&self) -> Value {
				match self {
					$(Self::$variant(object) => Serializable::to_wire(object),)+
				}
			}

			/// Rebuilds whichever registered type the tuple names.
			pub fn from_wire(value: Value) -> Result<Self, DecodeError> {
				let tuple = Tuple::open(value)?;

				$(
					if tuple.type_name() == <$variant as Serializable>::TYPE_NAME {
						return <$variant as Serializable>::from_tuple(tuple).map(Self::$variant);
					}
				)+

				Err(DecodeError::UnknownType(tuple.into_type_name()))
			}

			#[must_use]
			pub fn attachments(&self) -> &Attachments {
				match self {
					$(Self::$variant(object) => object.attachments(),)+
				}
			}

			pub fn attachments_mut(&mut self) -> &mut Attachments {
				match self {
					$(Self::$variant(object) => object.attachments_mut(),)+
				}
			}
		}

		$(
			impl From<$variant> for Object {
				fn from(object: $variant) -> Self {
					Self::$variant(object)
				}
			}

			/// Hands the object back unchanged if it's another type.
			impl TryFrom<Object> for $variant {
				type Error = Object;

				fn try_from(object: Object) -> Result<Self, Object> {
					match object {
						Object::$variant(object) => Ok(object),
						other => Err(other),
					}
				}
			}
		)+
	};
}

objects!(
	Attribute,
	AttrList,
	Text,
	Property,
	PropList,
	LookupTable,
	EngineDesc,
	ObservedPath,
	Component,
	Registry,
);

impl Object {
	#[must_use]
	pub fn serialize(&self) -> Vec<u8> {
		codec::to_bytes(&self.to_wire())
	}

	pub fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
		Self::from_wire(codec::from_bytes(bytes)?)
	}
}
