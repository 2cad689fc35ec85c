//! ## Leaky bucket
//!
//! The entrypoint to this module is [`Bucket`].
//!
//! A bucket stores a non-negative quantity, capped by a `limit` for checked
//! fills, which drains at `drain_rate` units per second of clock time. The
//! drain is simulated lazily: every operation which observes or mutates the
//! value first folds the elapsed time into it, so no background task is
//! needed and repeated calls within the same instant are idempotent.
//!
//! Construction goes through [`Bucket::new`] for the defaults (drain rate of
//! `1.0`, starting empty, system clock) or [`Bucket::builder`] for anything
//! else:
//!
//! ```rust
//! use drip::Bucket;
//!
//! // Allow a burst of 100, replenishing 10 per second.
//! let mut bucket = Bucket::builder(100.0).drain_rate(10.0).build()?;
//!
//! assert!(bucket.try_fill(1.0));
//! # Ok::<_, drip::ConfigError>(())
//! ```
//!
//! ⚠ Note: a `Bucket` is not thread-safe! Every operation is a plain
//! read-modify-write through `&mut self`. Callers sharing a bucket across
//! threads or tasks must serialize access externally, e.g. behind a mutex.

use crate::clock::{Clock, MonotonicClock};
use std::fmt::Display;
use std::time::Instant;

/// Clamp to zero, the lower bound of everything a bucket stores.
///
/// `f64::max` returns the non-NaN operand, so NaN also clamps to `0.0`.
#[inline]
fn zero(value: f64) -> f64 {
  value.max(0.0)
}

/// A leaky bucket accumulator.
///
/// Holds a value which grows when filled and drains continuously at a fixed
/// rate over the time read from its [`Clock`]. The value never goes below
/// zero. It can exceed [`limit`][Bucket::limit] through the unchecked
/// [`fill`][Bucket::fill] and [`set`][Bucket::set]; only
/// [`try_fill`][Bucket::try_fill] and [`fill_or_fail`][Bucket::fill_or_fail]
/// enforce capacity.
pub struct Bucket<C = MonotonicClock> {
  limit: f64,
  drain_rate: f64,
  value: f64,
  last_update: Instant,
  clock: C,
}

impl Bucket<MonotonicClock> {
  /// Create a bucket with the given `limit`, draining one unit per second,
  /// starting empty, reading the system clock.
  ///
  /// Use [`Bucket::builder`] to change any of those.
  pub fn new(limit: f64) -> Result<Self, ConfigError> {
    Self::builder(limit).build()
  }

  /// The [`BucketBuilder`] provides a builder for setting up the drain
  /// rate, the initial value, and the clock.
  pub fn builder(limit: f64) -> BucketBuilder<MonotonicClock> {
    BucketBuilder {
      limit,
      drain_rate: 1.0,
      initial: 0.0,
      clock: MonotonicClock,
    }
  }
}

impl<C: Clock> Bucket<C> {
  /// Fold elapsed clock time into the value.
  ///
  /// When nothing drained (no time passed, or a zero rate) the state is left
  /// untouched, so `last_update` only moves when the value does.
  fn reconcile(&mut self) {
    let now = self.clock.now();
    let elapsed = now.saturating_duration_since(self.last_update);
    let drained = elapsed.as_secs_f64() * self.drain_rate;
    if drained > 0.0 {
      self.value = zero(self.value - drained);
      self.last_update = now;
      trace!(drained, value = self.value, "reconciled");
    }
  }

  /// Get the current value of the bucket.
  pub fn get(&mut self) -> f64 {
    self.reconcile();
    self.value
  }

  /// Add `amount` to the bucket, without checking capacity.
  ///
  /// The value may end up above [`limit`][Bucket::limit]; use
  /// [`try_fill`][Bucket::try_fill] to stay within it. Amounts which are
  /// zero, negative, or NaN are ignored.
  pub fn fill(&mut self, amount: f64) {
    // NaN fails this comparison too
    if !(amount > 0.0) {
      return;
    }
    self.value = self.get() + amount;
  }

  /// Set the value of the bucket, clamping negatives to zero.
  ///
  /// This overwrites rather than reconciles: time elapsed before the call
  /// is discarded, and the drain restarts from now.
  pub fn set(&mut self, to: f64) {
    self.value = zero(to);
    self.last_update = self.clock.now();
  }

  /// Empty the bucket.
  pub fn reset(&mut self) {
    self.set(0.0);
  }

  /// Check if the bucket is empty.
  pub fn is_empty(&mut self) -> bool {
    self.get() == 0.0
  }

  /// Check if `amount` more would fit within the limit.
  ///
  /// Negative amounts are treated as zero. Like every observer, this
  /// reconciles elapsed time, so a `can_fill` followed by a `fill` drains
  /// only whatever time passes between the two calls.
  pub fn can_fill(&mut self, amount: f64) -> bool {
    self.get() + zero(amount) <= self.limit
  }

  /// Attempt to fill the bucket with `amount`, returning whether it fit.
  ///
  /// On `false` the value is left unchanged, apart from the reconciliation
  /// already performed by the capacity check. Negative amounts are treated
  /// as zero.
  pub fn try_fill(&mut self, amount: f64) -> bool {
    if !self.can_fill(amount) {
      trace!(amount, value = self.value, limit = self.limit, "fill rejected");
      return false;
    }
    // `can_fill` already reconciled
    self.value += zero(amount);
    true
  }

  /// Attempt to fill the bucket with `amount`, failing if it does not fit.
  pub fn fill_or_fail(&mut self, amount: f64) -> Result<(), CapacityError> {
    match self.try_fill(amount) {
      true => Ok(()),
      false => Err(CapacityError {
        amount,
        limit: self.limit,
      }),
    }
  }

  /// Drain the bucket by `amount`, clamping at zero.
  ///
  /// `drain` is not symmetric with [`fill`][Bucket::fill]: a negative
  /// `amount` is not ignored, it increases the value.
  pub fn drain(&mut self, amount: f64) {
    let value = self.get();
    self.set(value - amount);
  }

  /// Calculate the time in seconds to drain `amount`.
  ///
  /// Pure computation over the drain rate, no reconciliation. Non-positive
  /// amounts return `0.0`. With a drain rate of zero a positive amount
  /// returns `f64::INFINITY`; projections never fail.
  pub fn time_to_drain(&self, amount: f64) -> f64 {
    zero(amount / self.drain_rate)
  }

  /// Calculate the time in seconds until `amount` more would fit within the
  /// limit. Returns `0.0` when it already fits.
  pub fn time_until_can_fill(&mut self, amount: f64) -> f64 {
    let excess = self.get() + amount - self.limit;
    self.time_to_drain(excess)
  }

  /// Calculate the time in seconds until the value has drained down to
  /// `target`. Returns `0.0` when the value is already at or below it.
  pub fn time_until_value_is(&mut self, target: f64) -> f64 {
    let excess = self.get() - target;
    self.time_to_drain(excess)
  }

  /// Calculate the time in seconds until the bucket is empty.
  pub fn time_until_empty(&mut self) -> f64 {
    self.time_until_value_is(0.0)
  }

  /// The maximum capacity enforced by checked fills.
  #[inline]
  pub fn limit(&self) -> f64 {
    self.limit
  }

  /// The amount drained per second.
  #[inline]
  pub fn drain_rate(&self) -> f64 {
    self.drain_rate
  }
}

/// Calculate the drain rate which empties `amount` over `seconds`.
///
/// Plain division, with the usual floating point escape hatches spelled
/// out: a positive `amount` over zero `seconds` is `f64::INFINITY`, and
/// `0.0` over `0.0` is NaN. Feeding either into
/// [`Bucket::builder`][Bucket::builder] fails with
/// [`ConfigError::DrainRate`].
pub fn calculate_rate(amount: f64, seconds: f64) -> f64 {
  amount / seconds
}

impl<C> std::fmt::Debug for Bucket<C> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Bucket")
      .field("limit", &self.limit)
      .field("drain_rate", &self.drain_rate)
      .field("value", &self.value)
      .finish_non_exhaustive()
  }
}

/// Builder for a [`Bucket`].
pub struct BucketBuilder<C = MonotonicClock> {
  limit: f64,
  drain_rate: f64,
  initial: f64,
  clock: C,
}

impl<C> BucketBuilder<C> {
  /// Set the amount drained per second. Defaults to `1.0`.
  pub fn drain_rate(mut self, rate: f64) -> Self {
    self.drain_rate = rate;
    self
  }

  /// Set the initial value. Defaults to `0.0`; negatives are clamped to
  /// zero at build time.
  pub fn initial(mut self, value: f64) -> Self {
    self.initial = value;
    self
  }

  /// Set the clock the bucket reads time from. Defaults to
  /// [`MonotonicClock`].
  pub fn clock<C2>(self, clock: C2) -> BucketBuilder<C2> {
    BucketBuilder {
      limit: self.limit,
      drain_rate: self.drain_rate,
      initial: self.initial,
      clock,
    }
  }

  /// Build the bucket, reading the construction instant off the clock.
  ///
  /// Fails with [`ConfigError`] unless the limit is finite and positive
  /// and the drain rate is finite and non-negative.
  pub fn build(self) -> Result<Bucket<C>, ConfigError>
  where
    C: Clock,
  {
    if !(self.limit.is_finite() && self.limit > 0.0) {
      return Err(ConfigError::Limit { limit: self.limit });
    }
    if !(self.drain_rate.is_finite() && self.drain_rate >= 0.0) {
      return Err(ConfigError::DrainRate {
        rate: self.drain_rate,
      });
    }
    let last_update = self.clock.now();
    Ok(Bucket {
      limit: self.limit,
      drain_rate: self.drain_rate,
      value: zero(self.initial),
      last_update,
      clock: self.clock,
    })
  }
}

/// A bucket was configured with an out-of-range parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigError {
  /// The limit must be finite and greater than zero.
  Limit {
    /// The rejected limit.
    limit: f64,
  },

  /// The drain rate must be finite and non-negative.
  DrainRate {
    /// The rejected rate.
    rate: f64,
  },
}

impl Display for ConfigError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ConfigError::Limit { limit } => {
        write!(f, "bucket limit must be greater than 0, got {limit}")
      }
      ConfigError::DrainRate { rate } => {
        write!(f, "bucket drain rate must be >= 0, got {rate}")
      }
    }
  }
}

impl std::error::Error for ConfigError {}

/// An amount did not fit into the bucket.
///
/// Returned only by [`Bucket::fill_or_fail`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapacityError {
  /// The amount that was rejected.
  pub amount: f64,

  /// The limit of the bucket that rejected it.
  pub limit: f64,
}

impl Display for CapacityError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "cannot fill {} into bucket with limit {}",
      self.amount, self.limit
    )
  }
}

impl std::error::Error for CapacityError {}

static_assert_send!(Bucket);
static_assert_sync!(Bucket);
