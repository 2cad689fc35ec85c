//! Time sources consumed by [`Bucket`][crate::Bucket].
//!
//! A bucket never reads the ambient clock directly. It is handed a [`Clock`]
//! at construction and asks it for the current instant whenever it needs to
//! reconcile elapsed time. Swapping the clock out is how you test rate
//! limiting logic without sleeping: see [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// Implementations must return non-decreasing instants. The bucket treats
/// one second of clock time as one unit of its drain rate.
pub trait Clock {
  /// The current instant.
  fn now(&self) -> Instant;
}

/// The default clock, backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
  #[inline]
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// A clock which only moves when told to.
///
/// Cloning yields a handle to the same clock, so a test can keep one clone
/// and hand the other to a bucket:
///
/// ```rust
/// use drip::{Bucket, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let mut bucket = Bucket::builder(10.0).clock(clock.clone()).build()?;
///
/// bucket.fill(5.0);
/// clock.advance(Duration::from_secs(2));
/// assert_eq!(bucket.get(), 3.0);
/// # Ok::<_, drip::ConfigError>(())
/// ```
///
/// The clock can only be advanced, never rewound.
#[derive(Clone, Debug)]
pub struct ManualClock {
  base: Instant,
  offset: Arc<AtomicU64>,
}

impl ManualClock {
  /// Create a clock frozen at the current instant.
  pub fn new() -> Self {
    Self {
      base: Instant::now(),
      offset: Arc::new(AtomicU64::new(0)),
    }
  }

  /// Move the clock forward by `by`.
  ///
  /// All clones of this clock observe the advance.
  pub fn advance(&self, by: Duration) {
    self.offset.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Instant {
    self.base + Duration::from_nanos(self.offset.load(Ordering::SeqCst))
  }
}

/// A clock which follows tokio's time.
///
/// Inside a runtime with the `test-util` feature this honors
/// [`tokio::time::pause`] and [`tokio::time::advance`], so buckets embedded
/// in async code can be tested the same way tokio timers are.
///
/// Panics if used outside of a tokio runtime, as [`tokio::time::Instant`]
/// does.
#[cfg(feature = "tokio")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

#[cfg(feature = "tokio")]
impl Clock for TokioClock {
  #[inline]
  fn now(&self) -> Instant {
    tokio::time::Instant::now().into_std()
  }
}

static_assert_send!(MonotonicClock);
static_assert_sync!(MonotonicClock);

static_assert_send!(ManualClock);
static_assert_sync!(ManualClock);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn monotonic_clock_does_not_go_backwards() {
    let clock = MonotonicClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
  }

  #[test]
  fn manual_clock_is_frozen_until_advanced() {
    let clock = ManualClock::new();
    let a = clock.now();
    let b = clock.now();
    assert_eq!(a, b);

    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now() - a, Duration::from_secs(5));
  }

  #[test]
  fn manual_clock_clones_share_time() {
    let clock = ManualClock::new();
    let handle = clock.clone();
    let start = clock.now();

    handle.advance(Duration::from_millis(1500));
    assert_eq!(clock.now() - start, Duration::from_millis(1500));
  }
}
