//! Exact rational time.
//!
//! All arithmetic is performed on `value/scale` pairs with `i128` intermediates. Conversion to
//! floating seconds exists only for render-context consumers (noise seeds, easing) and for the
//! JSON boundary.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::foundation::core::Fps;
use crate::foundation::error::{MontageError, MontageResult};

/// Scale used when a reduced result no longer fits `i32`.
const FALLBACK_SCALE: i128 = 1_000_000_000;

/// Rational timestamp `value / scale` seconds, `scale > 0`.
#[derive(Clone, Copy, Debug)]
pub struct Timestamp {
    value: i64,
    scale: i32,
}

impl Timestamp {
    /// The zero timestamp.
    pub const ZERO: Self = Self { value: 0, scale: 1 };

    /// Create a validated timestamp.
    pub fn new(value: i64, scale: i32) -> MontageResult<Self> {
        if scale <= 0 {
            return Err(MontageError::validation("timestamp scale must be > 0"));
        }
        Ok(Self { value, scale })
    }

    /// Whole seconds.
    pub const fn seconds(secs: i64) -> Self {
        Self {
            value: secs,
            scale: 1,
        }
    }

    /// Whole milliseconds.
    pub const fn millis(ms: i64) -> Self {
        Self {
            value: ms,
            scale: 1000,
        }
    }

    /// Presentation time of frame `index` at `fps`.
    pub fn from_frame(index: u64, fps: Fps) -> Self {
        reduce(
            i128::from(index) * i128::from(fps.den),
            i128::from(fps.num),
        )
    }

    /// Numerator.
    pub fn value(self) -> i64 {
        self.value
    }

    /// Denominator (ticks per second).
    pub fn scale(self) -> i32 {
        self.scale
    }

    /// Floating seconds. Only for render-context consumers and serialization.
    pub fn seconds_f64(self) -> f64 {
        self.value as f64 / f64::from(self.scale)
    }

    /// Build from floating seconds at a preferred timescale, rounding to the nearest tick.
    pub fn from_seconds_f64(seconds: f64, scale: i32) -> MontageResult<Self> {
        if !seconds.is_finite() {
            return Err(MontageError::validation("timestamp seconds must be finite"));
        }
        if scale <= 0 {
            return Err(MontageError::validation("timestamp scale must be > 0"));
        }
        let ticks = (seconds * f64::from(scale)).round();
        if ticks.abs() > i64::MAX as f64 {
            return Err(MontageError::validation("timestamp out of range"));
        }
        Ok(Self {
            value: ticks as i64,
            scale,
        })
    }

    /// Exact sum.
    pub fn add(self, rhs: Self) -> Self {
        let (a, b, den) = self.common(rhs);
        reduce(a + b, den)
    }

    /// Exact difference.
    pub fn subtract(self, rhs: Self) -> Self {
        let (a, b, den) = self.common(rhs);
        reduce(a - b, den)
    }

    /// Exact comparison.
    pub fn compare(self, rhs: Self) -> Ordering {
        let a = i128::from(self.value) * i128::from(rhs.scale);
        let b = i128::from(rhs.value) * i128::from(self.scale);
        a.cmp(&b)
    }

    /// Multiply by the rational factor `num / den`.
    pub fn scaled(self, num: i64, den: i64) -> MontageResult<Self> {
        if den == 0 {
            return Err(MontageError::validation("scale factor denominator must be non-zero"));
        }
        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
        Ok(reduce(
            i128::from(self.value) * i128::from(num),
            i128::from(self.scale) * i128::from(den),
        ))
    }

    /// Re-express at `scale`, rounding half away from zero.
    pub fn convert_scale(self, scale: i32) -> MontageResult<Self> {
        if scale <= 0 {
            return Err(MontageError::validation("timestamp scale must be > 0"));
        }
        let num = i128::from(self.value) * i128::from(scale);
        let den = i128::from(self.scale);
        let q = div_round(num, den);
        Ok(Self {
            value: clamp_i64(q),
            scale,
        })
    }

    /// Number of whole frames at `fps` that fit in `[0, self)`; negative times yield `0`.
    pub fn frames_floor(self, fps: Fps) -> u64 {
        if self.value <= 0 {
            return 0;
        }
        let num = i128::from(self.value) * i128::from(fps.num);
        let den = i128::from(self.scale) * i128::from(fps.den);
        (num / den).clamp(0, i128::from(u64::MAX)) as u64
    }

    /// Number of whole samples at `sample_rate` in `[0, self)`, floor semantics.
    pub fn samples_floor(self, sample_rate: u32) -> u64 {
        if self.value <= 0 {
            return 0;
        }
        let num = i128::from(self.value) * i128::from(sample_rate);
        (num / i128::from(self.scale)).clamp(0, i128::from(u64::MAX)) as u64
    }

    /// Sample index nearest to this timestamp at `sample_rate`.
    pub fn samples_round(self, sample_rate: u32) -> i64 {
        let num = i128::from(self.value) * i128::from(sample_rate);
        clamp_i64(div_round(num, i128::from(self.scale)))
    }

    /// Time of sample `index` at `sample_rate`.
    pub fn from_sample(index: u64, sample_rate: u32) -> Self {
        reduce(i128::from(index), i128::from(sample_rate.max(1)))
    }

    /// Return `true` when the timestamp is exactly zero.
    pub fn is_zero(self) -> bool {
        self.value == 0
    }

    /// Return `true` when the timestamp is strictly negative.
    pub fn is_negative(self) -> bool {
        self.value < 0
    }

    /// Ratio `self / rhs` as `f64`, computed from the exact difference.
    ///
    /// Returns `0.0` when `rhs` is zero.
    pub fn ratio(self, rhs: Self) -> f64 {
        let num = i128::from(self.value) * i128::from(rhs.scale);
        let den = i128::from(rhs.value) * i128::from(self.scale);
        if den == 0 {
            return 0.0;
        }
        num as f64 / den as f64
    }

    fn common(self, rhs: Self) -> (i128, i128, i128) {
        let sa = i128::from(self.scale);
        let sb = i128::from(rhs.scale);
        let den = lcm(sa, sb);
        (
            i128::from(self.value) * (den / sa),
            i128::from(rhs.value) * (den / sb),
            den,
        )
    }

    fn reduced(self) -> (i64, i32) {
        let g = gcd(i128::from(self.value).abs(), i128::from(self.scale)).max(1);
        (
            (i128::from(self.value) / g) as i64,
            (i128::from(self.scale) / g) as i32,
        )
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.compare(*other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(*other)
    }
}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reduced().hash(state);
    }
}

impl std::ops::Add for Timestamp {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Timestamp::add(self, rhs)
    }
}

impl std::ops::Sub for Timestamp {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.subtract(rhs)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}s", self.value, self.scale)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TimestampRepr {
    seconds: f64,
    preferred_timescale: i32,
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        TimestampRepr {
            seconds: self.seconds_f64(),
            preferred_timescale: self.scale,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = TimestampRepr::deserialize(deserializer)?;
        Timestamp::from_seconds_f64(repr.seconds, repr.preferred_timescale)
            .map_err(serde::de::Error::custom)
    }
}

/// Time range `[start, start + duration)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeRangeRepr", into = "TimeRangeRepr")]
pub struct TimeRange {
    start: Timestamp,
    duration: Timestamp,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeRangeRepr {
    start: Timestamp,
    duration: Timestamp,
}

impl TryFrom<TimeRangeRepr> for TimeRange {
    type Error = MontageError;

    fn try_from(r: TimeRangeRepr) -> MontageResult<Self> {
        TimeRange::new(r.start, r.duration)
    }
}

impl From<TimeRange> for TimeRangeRepr {
    fn from(r: TimeRange) -> Self {
        Self {
            start: r.start,
            duration: r.duration,
        }
    }
}

impl TimeRange {
    /// Create a validated range; `duration` must not be negative.
    pub fn new(start: Timestamp, duration: Timestamp) -> MontageResult<Self> {
        if duration.is_negative() {
            return Err(MontageError::validation("time range duration must be >= 0"));
        }
        Ok(Self { start, duration })
    }

    /// Range from `start` to `end`; `end` must not precede `start`.
    pub fn from_bounds(start: Timestamp, end: Timestamp) -> MontageResult<Self> {
        Self::new(start, end - start)
    }

    /// Inclusive start.
    pub fn start(self) -> Timestamp {
        self.start
    }

    /// Length of the range.
    pub fn duration(self) -> Timestamp {
        self.duration
    }

    /// Exclusive end, `start + duration`.
    pub fn end(self) -> Timestamp {
        self.start + self.duration
    }

    /// Return `true` when the range has zero length.
    pub fn is_empty(self) -> bool {
        self.duration.is_zero()
    }

    /// Half-open containment: `start <= t < end`. Empty ranges contain nothing.
    pub fn contains(self, t: Timestamp) -> bool {
        self.start <= t && t < self.end()
    }

    /// Return `true` when both ranges share a non-empty span.
    pub fn overlaps(self, other: Self) -> bool {
        self.intersect(other).is_some()
    }

    /// Shared span of both ranges, or `None` when it would be empty.
    pub fn intersect(self, other: Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        if start < end {
            Some(Self {
                start,
                duration: end - start,
            })
        } else {
            None
        }
    }

    /// Range moved by `delta`.
    pub fn shifted(self, delta: Timestamp) -> Self {
        Self {
            start: self.start + delta,
            duration: self.duration,
        }
    }
}

/// Exact overlap test between two ranges.
pub fn overlaps(a: TimeRange, b: TimeRange) -> bool {
    a.overlaps(b)
}

/// Exact intersection between two ranges.
pub fn intersect(a: TimeRange, b: TimeRange) -> Option<TimeRange> {
    a.intersect(b)
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}

fn lcm(a: i128, b: i128) -> i128 {
    (a / gcd(a, b).max(1)) * b
}

fn div_round(num: i128, den: i128) -> i128 {
    let half = den / 2;
    if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    }
}

fn clamp_i64(v: i128) -> i64 {
    v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

fn reduce(num: i128, den: i128) -> Timestamp {
    let g = gcd(num.abs(), den).max(1);
    let (num, den) = (num / g, den / g);
    if den <= i128::from(i32::MAX) && num >= i128::from(i64::MIN) && num <= i128::from(i64::MAX) {
        return Timestamp {
            value: num as i64,
            scale: den as i32,
        };
    }
    // Out of representable range: fall back to nanosecond ticks.
    let value = num
        .checked_mul(FALLBACK_SCALE)
        .map(|n| div_round(n, den))
        .unwrap_or_else(|| (num / den).saturating_mul(FALLBACK_SCALE));
    Timestamp {
        value: clamp_i64(value),
        scale: FALLBACK_SCALE as i32,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/time.rs"]
mod tests;
