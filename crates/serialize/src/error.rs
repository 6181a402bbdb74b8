use thiserror::Error;

/// Everything that can go wrong while turning wire bytes back into an object.
///
/// Decoding always builds a fresh value, so on any of these errors the caller
/// gets nothing instead of a half-filled object.
#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("malformed wire bytes: {0}")]
	Malformed(#[from] rmpv::decode::Error),
	#[error("{0} trailing bytes after the encoded object")]
	TrailingBytes(usize),
	#[error("expected an object tuple, found {0}")]
	NotATuple(&'static str),
	#[error("unregistered type name <name='{0}'>")]
	UnknownType(String),
	#[error("type mismatch <expected='{expected}', found='{found}'>")]
	TypeMismatch {
		expected: &'static str,
		found: String,
	},
	#[error("tuple for {type_name} is too short <missing_field='{field}'>")]
	Truncated {
		type_name: &'static str,
		field: &'static str,
	},
	#[error("field has an unexpected wire kind <field='{field}', expected='{expected}'>")]
	UnexpectedKind {
		field: &'static str,
		expected: &'static str,
	},
	#[error("invalid value <field='{field}', value='{value}'>")]
	InvalidValue { field: &'static str, value: String },
	#[error("decoded {type_name} is inconsistent: {reason}")]
	Invariant {
		type_name: &'static str,
		reason: String,
	},
}

/// Name of the wire kind of a value, used in error messages.
pub(crate) const fn kind_of(value: &rmpv::Value) -> &'static str {
	match value {
		rmpv::Value::Nil => "nil",
		rmpv::Value::Boolean(_) => "boolean",
		rmpv::Value::Integer(_) => "integer",
		rmpv::Value::F32(_) | rmpv::Value::F64(_) => "float",
		rmpv::Value::String(_) => "string",
		rmpv::Value::Binary(_) => "binary",
		rmpv::Value::Array(_) => "array",
		rmpv::Value::Map(_) => "map",
		rmpv::Value::Ext(_, _) => "ext",
	}
}
