//!
//! # Serialization protocol
//!
//! Every object that crosses the input-method bus, or lands in the registry
//! cache, is flattened into a self-describing tuple:
//!
//! ```text
//! [type_name, field_1, .., field_n, {attachment_key: value, ..}]
//! ```
//!
//! - The leading type name lets a receiver rebuild the object without knowing
//!   in advance what it is, by matching it against a closed set of known types;
//! - Field order is append-only, so old caches and old peers keep working;
//! - The trailing attachment map carries extra values the receiver may not
//!   understand but must hand back unchanged.
//!
//! The tuple itself is a MessagePack value, see [`codec`].

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod codec;

mod attachments;
mod error;
mod serializable;
mod wire;

pub use attachments::Attachments;
pub use error::DecodeError;
pub use serializable::{Fields, Serializable, Tuple};
pub use wire::Wire;

pub use rmpv::Value;
