use std::{borrow::Cow, fmt::Write, sync::LazyLock};

use regex::Regex;
use serde_yaml_ng::{Mapping, Number, Value};

/// Controls how strings are prepared before being written out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresentMode {
	/// Strings are written as they are.
	Plain,
	/// Every `$` is doubled, so that the output survives a reader that performs variable
	/// interpolation.
	#[default]
	EscapeDollar,
}

/// The YAML scalar style chosen for a string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarStyle {
	Plain,
	SingleQuoted,
	DoubleQuoted,
}

/// A string with its presentation decided, ready to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresentedScalar<'a> {
	pub text: Cow<'a, str>,
	pub style: ScalarStyle,
}

/// Strings that some YAML readers would load as booleans.
const BOOLEAN_LIKE: [&str; 8] = ["y", "n", "yes", "no", "on", "off", "true", "false"];

// Plain scalars that a YAML 1.1 or 1.2 reader would resolve to something other than a string.
static NON_STRING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?x)^(?:
			~ | null | Null | NULL
			| [-+]?(?:0b[01_]+ | 0o?[0-7_]+ | [0-9][0-9_]* | 0x[0-9a-fA-F_]+ | [1-9][0-9_]*(?::[0-5]?[0-9])+)
			| [-+]?(?:[0-9][0-9_]*)?\.[0-9_]*(?:[eE][-+]?[0-9]+)?
			| [-+]?[0-9][0-9_]*(?:\.[0-9_]*)?[eE][-+]?[0-9]+
			| [-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*
			| [-+]?\.(?:inf|Inf|INF) | \.(?:nan|NaN|NAN)
			| [0-9]{4}-[0-9]{1,2}-[0-9]{1,2}.*
			| << | =
		)$",
	)
	.expect("Failed to initialize the non-string scalar regex")
});

const INDICATORS: &str = "-?:,[]{}#&*!|>'\"%@`";

fn needs_escapes(c: char) -> bool {
	c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}')
}

fn infer_style(text: &str) -> ScalarStyle {
	if text.chars().any(needs_escapes) {
		return ScalarStyle::DoubleQuoted;
	}

	let mut chars = text.chars();

	let Some(first) = chars.next() else {
		return ScalarStyle::SingleQuoted;
	};

	let starts_with_indicator = INDICATORS.contains(first)
		&& !(matches!(first, '-' | '?' | ':') && chars.next().is_some_and(|c| c != ' '));

	let is_ambiguous = starts_with_indicator
		|| text.starts_with(' ')
		|| text.ends_with(' ')
		|| text.starts_with("---")
		|| text.starts_with("...")
		|| text.ends_with(':')
		|| text.contains(": ")
		|| text.contains(" #")
		|| NON_STRING_REGEX.is_match(text);

	if is_ambiguous {
		ScalarStyle::SingleQuoted
	} else {
		ScalarStyle::Plain
	}
}

/// Decides how a string must be written.
///
/// Boolean-like values are always double quoted, in any casing. In [`PresentMode::EscapeDollar`]
/// the `$` characters are doubled before anything else is checked.
pub fn present_str(value: &str, mode: PresentMode) -> PresentedScalar<'_> {
	let text = match mode {
		PresentMode::EscapeDollar if value.contains('$') => Cow::Owned(value.replace('$', "$$")),
		_ => Cow::Borrowed(value),
	};

	let lowercase = text.to_lowercase();

	let style = if BOOLEAN_LIKE.contains(&lowercase.as_str()) {
		ScalarStyle::DoubleQuoted
	} else {
		infer_style(&text)
	};

	PresentedScalar { text, style }
}

impl PresentedScalar<'_> {
	/// The scalar as it appears in the document, quotes included.
	pub fn render(&self) -> String {
		match self.style {
			ScalarStyle::Plain => self.text.to_string(),
			ScalarStyle::SingleQuoted => format!("'{}'", self.text.replace('\'', "''")),
			ScalarStyle::DoubleQuoted => {
				let mut out = String::with_capacity(self.text.len() + 2);
				out.push('"');

				for c in self.text.chars() {
					match c {
						'"' => out.push_str("\\\""),
						'\\' => out.push_str("\\\\"),
						'\n' => out.push_str("\\n"),
						'\t' => out.push_str("\\t"),
						'\r' => out.push_str("\\r"),
						'\0' => out.push_str("\\0"),
						c if needs_escapes(c) => {
							let code = u32::from(c);
							if code <= 0xff {
								let _ = write!(out, "\\x{code:02X}");
							} else {
								let _ = write!(out, "\\u{code:04X}");
							}
						}
						c => out.push(c),
					}
				}

				out.push('"');
				out
			}
		}
	}
}

/// How a complex value is written: either as a single string or as a mapping.
#[derive(Clone, Debug, PartialEq)]
pub enum Presentation {
	Short(String),
	Long(Mapping),
}

impl From<Presentation> for Value {
	fn from(presentation: Presentation) -> Self {
		match presentation {
			Presentation::Short(s) => Self::String(s),
			Presentation::Long(map) => Self::Mapping(map),
		}
	}
}

/// Implemented by the domain types that are not written as plain scalars.
pub trait Present {
	fn present(&self) -> Presentation;

	fn to_yaml_value(&self) -> Value {
		self.present().into()
	}
}

pub(crate) fn json_to_yaml(json: &serde_json::Value) -> Value {
	match json {
		serde_json::Value::Null => Value::Null,
		serde_json::Value::Bool(b) => Value::Bool(*b),
		serde_json::Value::Number(n) => {
			if let Some(u) = n.as_u64() {
				Value::Number(Number::from(u))
			} else if let Some(i) = n.as_i64() {
				Value::Number(Number::from(i))
			} else if let Some(f) = n.as_f64() {
				Value::Number(Number::from(f))
			} else {
				Value::String(n.to_string())
			}
		}
		serde_json::Value::String(s) => Value::String(s.clone()),
		serde_json::Value::Array(vec) => Value::Sequence(vec.iter().map(json_to_yaml).collect()),
		serde_json::Value::Object(map) => Value::Mapping(
			map.iter()
				.map(|(k, v)| (Value::String(k.clone()), json_to_yaml(v)))
				.collect(),
		),
	}
}
