//!
//! # IBus core objects
//!
//! The object layer of the input-method bus, shared by the daemon, engines
//! and panels:
//! - Styled [`Text`] with attribute runs;
//! - Panel [`Property`] trees with key-based updates;
//! - Paged candidate [`LookupTable`]s;
//! - [`Component`]s and the [`EngineDesc`]s they provide, loaded from XML
//!   descriptors, with supervision of the component process;
//! - The [`Registry`] of all components, with its on-disk cache, staleness
//!   checks and a debounced change monitor.
//!
//! Every type serializes to the self-describing tuple format of
//! [`ibus_serialize`], and [`Object`] decodes any of them without knowing in
//! advance which one arrives.
//!
//! ## Example
//!
//! ```
//! use ibus_core::{Object, PropList, PropType, Property, Serializable};
//!
//! let mut props: PropList = [Property::new("InputMode", PropType::Menu).with_label("Mode")]
//! 	.into_iter()
//! 	.collect();
//!
//! props.update_property(&Property::new("InputMode", PropType::Menu).with_label("あ"));
//!
//! let Object::PropList(decoded) = Object::deserialize(&props.serialize()).unwrap() else {
//! 	panic!("not a property list");
//! };
//! assert_eq!(decoded.get(0).unwrap().label().content(), "あ");
//! ```

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

pub mod component;
pub mod config;
pub mod lookup_table;
pub mod object;
pub mod property;
pub mod registry;
pub mod text;

mod error;

pub use component::{Component, EngineDesc, ObservedPath, ParseError, SpawnError};
pub use config::RegistryConfig;
pub use error::FileIOError;
pub use lookup_table::{LookupTable, Orientation};
pub use object::Object;
pub use property::{PropList, PropState, PropType, Property};
pub use registry::{CacheCorrupt, CacheError, Registry, RegistryError};
pub use text::{AttrList, AttrType, Attribute, Text, UnderlineKind};

pub use ibus_serialize::{Attachments, DecodeError, Serializable, Value};
