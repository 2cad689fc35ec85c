#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

pub(crate) const fn assert_sync<T: ?Sized + Sync>() {}
macro_rules! static_assert_sync {
  ($T:ty) => {
    const _: () = {
      let _ = $crate::assert_sync::<$T>;
    };
  };
}

pub(crate) const fn assert_send<T: ?Sized + Send>() {}
macro_rules! static_assert_send {
  ($T:ty) => {
    const _: () = {
      let _ = $crate::assert_send::<$T>;
    };
  };
}

pub mod bucket;
pub use bucket::{calculate_rate, Bucket, BucketBuilder, CapacityError, ConfigError};

pub mod clock;
pub use clock::{Clock, ManualClock, MonotonicClock};

#[cfg(feature = "tokio")]
pub use clock::TokioClock;
