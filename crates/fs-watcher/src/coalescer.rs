//! Quiet-period coalescing
//!
//! A package install can touch dozens of watched files in a fraction of a
//! second. The coalescer turns such a burst into a single firing: the first
//! event arms a deadline, later events while armed are absorbed, and the
//! deadline is never pushed back.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
pub struct Coalescer {
	quiet_period: Duration,
	/// When the pending firing was armed
	armed_at: Option<Instant>,
}

impl Coalescer {
	#[must_use]
	pub const fn new(quiet_period: Duration) -> Self {
		Self {
			quiet_period,
			armed_at: None,
		}
	}

	#[must_use]
	pub const fn quiet_period(&self) -> Duration {
		self.quiet_period
	}

	/// Records an event, arming the deadline unless one is already pending.
	///
	/// Returns `true` if this call armed it.
	pub fn record(&mut self, now: Instant) -> bool {
		if self.armed_at.is_some() {
			return false;
		}

		trace!(quiet_period = ?self.quiet_period, "Arming coalescing deadline;");
		self.armed_at = Some(now);
		true
	}

	#[must_use]
	pub const fn is_pending(&self) -> bool {
		self.armed_at.is_some()
	}

	#[must_use]
	pub fn deadline(&self) -> Option<Instant> {
		self.armed_at.map(|armed_at| armed_at + self.quiet_period)
	}

	/// Returns `true` exactly once per armed burst, when the quiet period has
	/// elapsed, and disarms.
	pub fn tick(&mut self, now: Instant) -> bool {
		match self.deadline() {
			Some(deadline) if now >= deadline => {
				self.armed_at = None;
				true
			}
			_ => false,
		}
	}

	pub fn reset(&mut self) {
		self.armed_at = None;
	}
}
