//! Timestamp constants and splitting
//!
//! The database stores signed nanosecond instants; the wire protocol emits
//! them as a `(millis, nanos)` pair with `nanos` normalized to
//! `[0, 999_999]`.

/// Earliest queryable instant.
pub const TIME_LOW: i64 = 1 - (16 << 56);

/// Latest queryable instant.
pub const TIME_HIGH: i64 = (48 << 56) - 1;

/// Sentinel for a missing or failed boundary lookup.
pub const INVALID_TIME: i64 = i64::MIN;

/// Split a nanosecond instant into `(millis, nanos)` with
/// `nanos ∈ [0, 999_999]`.
///
/// The identity `millis * 1_000_000 + nanos == time` holds for every input;
/// for negative instants the millisecond part is rounded toward negative
/// infinity so the remainder stays non-negative.
pub fn split_time(time: i64) -> (i64, i64) {
    (time.div_euclid(1_000_000), time.rem_euclid(1_000_000))
}
