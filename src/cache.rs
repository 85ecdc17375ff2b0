//! Thread-safe TTL cache for upstream response bodies.
//!
//! A single [`RwLock`] guards the whole map: [`TtlCache::get`] shares it, while
//! [`TtlCache::set`] and [`TtlCache::sweep_expired`] take it exclusively. Reads treat
//! expired entries as misses without removing them; physical removal belongs to the
//! periodic sweep started by [`TtlCache::spawn_sweeper`].

// std
use std::time::Duration as StdDuration;
// crates.io
use bytes::Bytes;
use tokio::{
	task::JoinHandle,
	time::{self as tokio_time, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	obs,
};

/// Interval between background sweeps unless configured otherwise.
pub const DEFAULT_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(5 * 60);
/// Shortest sweep interval accepted by [`TtlCache::spawn_sweeper`].
pub const MIN_SWEEP_INTERVAL: StdDuration = StdDuration::from_millis(1);
/// Longest sweep interval accepted by [`TtlCache::spawn_sweeper`].
pub const MAX_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(24 * 60 * 60);

type EntryMap = HashMap<String, CacheEntry>;

/// Cached payload plus its expiry instant.
#[derive(Clone, Debug)]
struct CacheEntry {
	payload: Bytes,
	expires_at: OffsetDateTime,
}
impl CacheEntry {
	fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant > self.expires_at
	}
}

/// Process-scoped key -> bytes store with per-entry expiry.
#[derive(Debug)]
pub struct TtlCache {
	entries: RwLock<EntryMap>,
	clock: Arc<dyn Clock>,
}
impl TtlCache {
	/// Creates an empty cache driven by the system clock.
	pub fn new() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}

	/// Creates an empty cache driven by the provided clock.
	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		Self { entries: RwLock::new(HashMap::new()), clock }
	}

	/// Returns the payload stored under `key` if it has not expired.
	pub fn get(&self, key: &str) -> Option<Bytes> {
		let now = self.clock.now();
		let entries = self.entries.read();
		let entry = entries.get(key)?;

		if entry.is_expired_at(now) {
			return None;
		}

		Some(entry.payload.clone())
	}

	/// Stores `payload` under `key` until `now + ttl`, replacing any previous entry.
	pub fn set(&self, key: impl Into<String>, payload: Bytes, ttl: Duration) {
		let expires_at = self.clock.now() + ttl;

		self.entries.write().insert(key.into(), CacheEntry { payload, expires_at });
	}

	/// Removes every expired entry and returns how many were dropped.
	pub fn sweep_expired(&self) -> usize {
		let now = self.clock.now();
		let mut entries = self.entries.write();
		let before = entries.len();

		entries.retain(|_, entry| !entry.is_expired_at(now));

		before - entries.len()
	}

	/// Expiry instant recorded for `key`, whether or not it has passed.
	pub fn expires_at(&self, key: &str) -> Option<OffsetDateTime> {
		self.entries.read().get(key).map(|entry| entry.expires_at)
	}

	/// Number of physically stored entries, including expired ones awaiting the sweep.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Spawns the periodic sweep on the current tokio runtime.
	///
	/// The first sweep runs one `interval` after spawning. `interval` is clamped to
	/// [`MIN_SWEEP_INTERVAL`]..=[`MAX_SWEEP_INTERVAL`]. The task exits once `cancel` is
	/// cancelled; it never terminates on its own otherwise.
	pub fn spawn_sweeper(
		self: &Arc<Self>,
		interval: StdDuration,
		cancel: CancellationToken,
	) -> JoinHandle<()> {
		let cache = Arc::clone(self);
		let interval = interval.clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);

		tokio::spawn(async move {
			let mut ticker = tokio_time::interval_at(Instant::now() + interval, interval);

			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

			loop {
				tokio::select! {
					_ = cancel.cancelled() => break,
					_ = ticker.tick() => {
						let removed = cache.sweep_expired();

						obs::record_sweep(removed, cache.len());
					},
				}
			}
		})
	}
}
impl Default for TtlCache {
	fn default() -> Self {
		Self::new()
	}
}
