//! Byte-level framing of wire values.
//!
//! The wire value model is MessagePack, so an encoded object is exactly one
//! MessagePack value with nothing after it.

use rmpv::Value;

use crate::DecodeError;

/// Flattens a wire value into bytes.
///
/// # Panics
///
/// Will panic if `rmpv` fails to write into a `Vec<u8>`, which only happens on allocation failure.
#[must_use]
pub fn to_bytes(value: &Value) -> Vec<u8> {
	let mut buf = Vec::new();
	rmpv::encode::write_value(&mut buf, value).expect("writing into a Vec<u8> can't fail");
	buf
}

/// Reads exactly one wire value from `bytes`.
pub fn from_bytes(bytes: &[u8]) -> Result<Value, DecodeError> {
	let mut reader = bytes;
	let value = rmpv::decode::read_value(&mut reader)?;

	if !reader.is_empty() {
		return Err(DecodeError::TrailingBytes(reader.len()));
	}

	Ok(value)
}
