//! Filesystem watching for the component registry
//!
//! Wraps the platform backend (inotify, FSEvents, ReadDirectoryChangesW via
//! `notify`) behind a small surface:
//! - [`PathWatcher`] holds one non-recursive watch per distinct path and
//!   forwards normalized [`FsEvent`]s over a channel;
//! - [`Coalescer`] turns a burst of events into one deferred firing.

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

mod coalescer;
mod error;
mod event;
mod watcher;

pub use coalescer::Coalescer;
pub use error::WatcherError;
pub use event::{FsEvent, FsEventKind};
pub use watcher::PathWatcher;

pub type Result<T> = std::result::Result<T, WatcherError>;

/// Re-exported so consumers can merge our channel without naming the crate.
pub use async_channel::Receiver as EventReceiver;
