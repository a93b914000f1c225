//! Compact duration strings, as used by healthcheck intervals and timeouts.
//!
//! Formatting works on integer nanosecond counts and always picks the largest unit that can
//! represent the value without decimals. Parsing accepts the go-style `1h2m3.5s` syntax and
//! returns seconds, with [`parse_duration_nanos`] as its exact counterpart.

use std::{
	fmt::{self, Display},
	sync::LazyLock,
};

#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::DurationError;

const PROMOTIONS: [(u128, &str); 5] = [(1000, "us"), (1000, "ms"), (1000, "s"), (60, "m"), (60, "h")];

/// Formats a nanosecond count with the coarsest unit that keeps it an integer.
///
/// ```
/// use compose_serialize::format_nanos;
///
/// assert_eq!(format_nanos(0), "0ns");
/// assert_eq!(format_nanos(11_000), "11us");
/// assert_eq!(format_nanos(24 * 60 * 1_000_000_000), "24m");
/// assert_eq!(format_nanos(1_500_000_000), "1500ms");
/// ```
pub fn format_nanos(nanos: u128) -> String {
	if nanos == 0 {
		return "0ns".to_string();
	}

	let mut value = nanos;
	let mut unit = "ns";

	for (factor, next_unit) in PROMOTIONS {
		if value % factor != 0 {
			break;
		}

		value /= factor;
		unit = next_unit;
	}

	format!("{value}{unit}")
}

/// Like [`format_nanos`], for counts that arrive as floating point numbers.
///
/// The fractional part is truncated. Negative and non-finite values are rejected, and so are
/// values that do not fit in a `u128`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_nanos_f64(nanos: f64) -> Result<String, DurationError> {
	if !nanos.is_finite() {
		return Err(DurationError::NotFinite(nanos));
	}

	if nanos < 0.0 {
		return Err(DurationError::Negative(nanos));
	}

	// 2^128, the first value past `u128::MAX`.
	if nanos >= 2f64.powi(128) {
		return Err(DurationError::OutOfRange(nanos));
	}

	Ok(format_nanos(nanos.trunc() as u128))
}

/// A nanosecond count, as found in a normalized healthcheck.
///
/// Integer counts are exact up to `u64::MAX` (about 584 years). Anything larger is read as a
/// float, keeps only the precision of an `f64` and is truncated when formatted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum Nanoseconds {
	Whole(u64),
	Fractional(f64),
}

impl Nanoseconds {
	pub fn format(self) -> Result<String, DurationError> {
		match self {
			Self::Whole(n) => Ok(format_nanos(n.into())),
			Self::Fractional(f) => format_nanos_f64(f),
		}
	}
}

impl From<u64> for Nanoseconds {
	fn from(value: u64) -> Self {
		Self::Whole(value)
	}
}

/// The result of [`parse_duration`].
///
/// Stays an integer when every component is a whole number of hours, minutes or seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Seconds {
	Int(u64),
	Float(f64),
}

impl Seconds {
	#[allow(clippy::cast_precision_loss)]
	pub const fn as_f64(self) -> f64 {
		match self {
			Self::Int(i) => i as f64,
			Self::Float(f) => f,
		}
	}
}

impl Display for Seconds {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(i) => write!(f, "{i}"),
			Self::Float(fl) => write!(f, "{fl}"),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
	Hours,
	Minutes,
	Seconds,
	Millis,
	Micros,
	Nanos,
}

impl Unit {
	// Capture group names, in the order the components must appear.
	const ORDERED: [(&'static str, Self); 6] = [
		("hours", Self::Hours),
		("mins", Self::Minutes),
		("secs", Self::Seconds),
		("milli", Self::Millis),
		("micro", Self::Micros),
		("nano", Self::Nanos),
	];

	const fn nanos(self) -> u128 {
		match self {
			Self::Hours => 3_600_000_000_000,
			Self::Minutes => 60_000_000_000,
			Self::Seconds => 1_000_000_000,
			Self::Millis => 1_000_000,
			Self::Micros => 1_000,
			Self::Nanos => 1,
		}
	}

	const fn whole_seconds(self) -> Option<u64> {
		match self {
			Self::Hours => Some(3600),
			Self::Minutes => Some(60),
			Self::Seconds => Some(1),
			Self::Millis | Self::Micros | Self::Nanos => None,
		}
	}

	fn to_seconds(self, value: f64) -> f64 {
		match self {
			Self::Hours => value * 3600.0,
			Self::Minutes => value * 60.0,
			Self::Seconds => value,
			Self::Millis => value / 1e3,
			Self::Micros => value / 1e6,
			Self::Nanos => value / 1e9,
		}
	}
}

static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	const NUMBER: &str = r"(?:[0-9]+\.?[0-9]*|\.[0-9]+)";

	Regex::new(&format!(
		r"(?i)^\s*(?:(?P<hours>{NUMBER})h)?(?:(?P<mins>{NUMBER})m)?(?:(?P<secs>{NUMBER})s)?(?:(?P<milli>{NUMBER})ms)?(?:(?P<micro>{NUMBER})(?:us|µs))?(?:(?P<nano>{NUMBER})ns)?\s*$"
	))
	.expect("Failed to initialize the duration regex")
});

fn components(input: &str) -> Option<Vec<(Unit, &str)>> {
	let captures = DURATION_REGEX.captures(input)?;

	let components: Vec<(Unit, &str)> = Unit::ORDERED
		.iter()
		.filter_map(|(group, unit)| captures.name(group).map(|m| (*unit, m.as_str())))
		.collect();

	if components.is_empty() {
		None
	} else {
		Some(components)
	}
}

fn is_whole(literal: &str) -> bool {
	literal.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a duration such as `1m24s`, `1.5ns` or `2h 30m ` into seconds.
///
/// Components must appear in the order `h`, `m`, `s`, `ms`, `us`/`µs`, `ns`, each at most once.
/// Returns `None` when nothing could be parsed.
///
/// ```
/// use compose_serialize::{Seconds, parse_duration};
///
/// assert_eq!(parse_duration("1m24s"), Some(Seconds::Int(84)));
/// assert_eq!(parse_duration("1.2s"), Some(Seconds::Float(1.2)));
/// assert_eq!(parse_duration("5s3h"), None);
/// ```
pub fn parse_duration(input: &str) -> Option<Seconds> {
	let components = components(input)?;

	let mut exact: Option<u64> = Some(0);
	let mut total = 0.0;

	for (unit, literal) in components {
		let value: f64 = literal.parse().ok()?;
		total += unit.to_seconds(value);

		exact = match (exact, unit.whole_seconds()) {
			(Some(acc), Some(factor)) if is_whole(literal) => literal
				.parse::<u64>()
				.ok()
				.and_then(|v| v.checked_mul(factor))
				.and_then(|v| acc.checked_add(v)),
			_ => None,
		};
	}

	Some(match exact {
		Some(secs) => Seconds::Int(secs),
		None => Seconds::Float(total),
	})
}

/// Parses a duration with the same grammar as [`parse_duration`], returning whole nanoseconds.
///
/// The arithmetic is exact, so any output of [`format_nanos`] parses back to the same count.
/// Fractions of a nanosecond are added up across components and truncated once, at the end.
pub fn parse_duration_nanos(input: &str) -> Option<u128> {
	// Digits past this point cannot move the result by a whole nanosecond.
	const MAX_FRACTION_DIGITS: usize = 24;
	const FRACTION_SCALE: u128 = 10u128.pow(24);

	let mut total: u128 = 0;
	// Sum of the fractional parts, in units of 10^-24 ns, truncated only once at the end.
	let mut fractions: u128 = 0;

	for (unit, literal) in components(input)? {
		let (whole, fraction) = literal.split_once('.').unwrap_or((literal, ""));
		let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];

		let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
		total = total.checked_add(whole.checked_mul(unit.nanos())?)?;

		if !fraction.is_empty() {
			let numerator: u128 = fraction.parse().ok()?;
			let padding = 10u128.checked_pow(u32::try_from(MAX_FRACTION_DIGITS - fraction.len()).ok()?)?;
			let scaled = numerator.checked_mul(padding)?.checked_mul(unit.nanos())?;

			total = total.checked_add(scaled / FRACTION_SCALE)?;
			fractions = fractions.checked_add(scaled % FRACTION_SCALE)?;
		}
	}

	total.checked_add(fractions / FRACTION_SCALE)
}
