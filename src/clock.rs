//! Time sources consulted for cache expiry and token freshness decisions.

// self
use crate::_prelude::*;

/// Supplies "now" so expiry can be exercised without sleeping.
pub trait Clock
where
	Self: Debug + Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually advanced clock for tests and simulations.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}

	/// Pins the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(OffsetDateTime::now_utc())
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn manual_clock_advances_and_pins() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));

		clock.advance(Duration::minutes(5));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 00:05 UTC));

		clock.set(macros::datetime!(2024-12-31 23:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2024-12-31 23:00 UTC));
	}
}
