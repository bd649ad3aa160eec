use std::time::Duration;

/// Doubling delay sequence with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
	next: Duration,
	max: Duration,
}

impl Backoff {
	pub fn new(initial: Duration, max: Duration) -> Self {
		Self {
			next: initial.min(max),
			max,
		}
	}

	/// Returns the delay to wait now and doubles the following one.
	pub fn next_delay(&mut self) -> Duration {
		let current = self.next;
		self.next = current.saturating_mul(2).min(self.max);
		current
	}

	/// Returns the delay the next call to [`Backoff::next_delay`] yields.
	pub fn peek(&self) -> Duration {
		self.next
	}
}
