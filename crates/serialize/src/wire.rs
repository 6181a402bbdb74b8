use std::{borrow::Cow, path::PathBuf};

use rmpv::Value;

use crate::DecodeError;

/// A value that can sit in one field slot of an object tuple.
///
/// Primitive implementations live here; object types get theirs from
/// [`serializable!`](crate::serializable) and integer-backed enums from
/// [`wire_int_enum!`](crate::wire_int_enum).
pub trait Wire: Sized {
	fn to_wire(&self) -> Value;

	/// `field` names the slot being decoded, for error reporting only.
	fn from_wire(value: Value, field: &'static str) -> Result<Self, DecodeError>;
}

fn unexpected(field: &'static str, expected: &'static str) -> DecodeError {
	DecodeError::UnexpectedKind { field, expected }
}

impl Wire for bool {
	fn to_wire(&self) -> Value {
		Value::Boolean(*self)
	}

	fn from_wire(value: Value, field: &'static str) -> Result<Self, DecodeError> {
		value.as_bool().ok_or_else(|| unexpected(field, "boolean"))
	}
}

impl Wire for u32 {
	fn to_wire(&self) -> Value {
		Value::from(*self)
	}

	fn from_wire(value: Value, field: &'static str) -> Result<Self, DecodeError> {
		let raw = value.as_u64().ok_or_else(|| unexpected(field, "unsigned integer"))?;
		Self::try_from(raw).map_err(|_| DecodeError::InvalidValue {
			field,
			value: raw.to_string(),
		})
	}
}

impl Wire for i64 {
	fn to_wire(&self) -> Value {
		Value::from(*self)
	}

	fn from_wire(value: Value, field: &'static str) -> Result<Self, DecodeError> {
		value.as_i64().ok_or_else(|| unexpected(field, "signed integer"))
	}
}

impl Wire for String {
	fn to_wire(&self) -> Value {
		Value::from(self.as_str())
	}

	fn from_wire(value: Value, field: &'static str) -> Result<Self, DecodeError> {
		match value {
			Value::String(s) => s.into_str().ok_or_else(|| unexpected(field, "UTF-8 string")),
			_ => Err(unexpected(field, "string")),
		}
	}
}

/// Borrowed constants go out like any other string and always come back owned.
impl Wire for Cow<'static, str> {
	fn to_wire(&self) -> Value {
		Value::from(self.as_ref())
	}

	fn from_wire(value: Value, field: &'static str) -> Result<Self, DecodeError> {
		String::from_wire(value, field).map(Cow::Owned)
	}
}

impl Wire for PathBuf {
	fn to_wire(&self) -> Value {
		Value::from(self.to_string_lossy().as_ref())
	}

	fn from_wire(value: Value, field: &'static str) -> Result<Self, DecodeError> {
		String::from_wire(value, field).map(Self::from)
	}
}

impl<T: Wire> Wire for Vec<T> {
	fn to_wire(&self) -> Value {
		Value::Array(self.iter().map(Wire::to_wire).collect())
	}

	fn from_wire(value: Value, field: &'static str) -> Result<Self, DecodeError> {
		match value {
			Value::Array(items) => items
				.into_iter()
				.map(|item| T::from_wire(item, field))
				.collect(),
			_ => Err(unexpected(field, "array")),
		}
	}
}

impl Wire for Value {
	fn to_wire(&self) -> Value {
		self.clone()
	}

	fn from_wire(value: Value, _field: &'static str) -> Result<Self, DecodeError> {
		Ok(value)
	}
}

/// Implements [`Wire`] for fieldless enums carried as `u32` discriminants.
///
/// The enum must be `Copy`, convert into `u32` and be `TryFrom<u32>`, which is
/// exactly what `int_enum::IntEnum` derives.
#[macro_export]
macro_rules! wire_int_enum {
	($($ty:ty),+ $(,)?) => {$(
		impl $crate::Wire for $ty {
			fn to_wire(&self) -> $crate::Value {
				$crate::Value::from(u32::from(*self))
			}

			fn from_wire(
				value: $crate::Value,
				field: &'static str,
			) -> ::std::result::Result<Self, $crate::DecodeError> {
				let raw = <u32 as $crate::Wire>::from_wire(value, field)?;
				<$ty>::try_from(raw).map_err(|_| $crate::DecodeError::InvalidValue {
					field,
					value: raw.to_string(),
				})
			}
		}
	)+};
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn narrows_integers_without_wrapping() {
		assert_eq!(u32::from_wire(Value::from(7u64), "x").unwrap(), 7);
		assert!(matches!(
			u32::from_wire(Value::from(u64::from(u32::MAX) + 1), "x"),
			Err(DecodeError::InvalidValue { field: "x", .. })
		));
		assert!(matches!(
			u32::from_wire(Value::from(-1i64), "x"),
			Err(DecodeError::UnexpectedKind { field: "x", .. })
		));
	}

	#[test]
	fn cow_always_decodes_owned() {
		let text: Cow<'static, str> = Cow::Borrowed("static");
		let back = Cow::<'static, str>::from_wire(text.to_wire(), "text").unwrap();

		assert!(matches!(back, Cow::Owned(ref s) if s == "static"));
	}

	#[test]
	fn vec_reports_element_errors() {
		let value = Value::Array(vec![Value::from(1u32), Value::from("two")]);

		assert!(matches!(
			Vec::<u32>::from_wire(value, "numbers"),
			Err(DecodeError::UnexpectedKind {
				field: "numbers",
				..
			})
		));
	}
}
