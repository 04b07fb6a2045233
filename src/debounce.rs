//! Coalescing of rapid outgoing updates.
//!
//! Widgets that report edits to the server schedule the latest payload here.
//! A new schedule replaces the pending payload and restarts the window ("latest wins"),
//! so at most one update is ever pending.

use web_time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
	window: Duration,
	pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
	#[must_use]
	pub fn new(window: Duration) -> Self {
		Self { window, pending: None }
	}

	/// Replaces any pending payload and restarts the window at `now`.
	///
	/// Returns the payload that was superseded, if any.
	pub fn schedule(&mut self, payload: T, now: Instant) -> Option<T> {
		self.pending.replace((now + self.window, payload)).map(|(_, superseded)| superseded)
	}

	/// Releases the pending payload once its window has elapsed.
	pub fn poll(&mut self, now: Instant) -> Option<T> {
		match &self.pending {
			Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, payload)| payload),
			_ => None,
		}
	}

	/// Releases the pending payload immediately.
	pub fn flush(&mut self) -> Option<T> {
		self.pending.take().map(|(_, payload)| payload)
	}

	pub fn cancel(&mut self) {
		self.pending = None;
	}

	#[must_use]
	pub fn deadline(&self) -> Option<Instant> {
		self.pending.as_ref().map(|(deadline, _)| *deadline)
	}

	#[must_use]
	pub fn has_pending(&self) -> bool {
		self.pending.is_some()
	}
}
