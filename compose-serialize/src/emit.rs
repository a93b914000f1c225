use serde_yaml_ng::{Mapping, Value, value::TaggedValue};

use crate::present::{PresentMode, present_str};

/// Layout settings for [`to_string`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmitterOptions {
	pub mode: PresentMode,
	/// Spaces per nesting level of a mapping.
	pub indent: usize,
	/// Writes mapping keys in lexical order instead of insertion order.
	pub sort_keys: bool,
}

impl Default for EmitterOptions {
	fn default() -> Self {
		Self {
			mode: PresentMode::default(),
			indent: 2,
			sort_keys: false,
		}
	}
}

/// Writes a value as a block style YAML document.
///
/// Strings go through [`present_str`], so their quoting follows the chosen [`PresentMode`].
/// Sequences nested in a mapping are not indented, and empty collections are written in flow
/// style. Long plain scalars are never folded across lines, whatever their width.
///
/// ```
/// use compose_serialize::{EmitterOptions, emit};
/// use serde_yaml_ng::Value;
///
/// let value: Value = serde_yaml_ng::from_str("ports: ['80:80', '1:20']\nrestart: 'no'").unwrap();
///
/// assert_eq!(
/// 	emit::to_string(&value, &EmitterOptions::default()),
/// 	"ports:\n- 80:80\n- '1:20'\nrestart: \"no\"\n"
/// );
/// ```
pub fn to_string(value: &Value, options: &EmitterOptions) -> String {
	let mut emitter = Emitter {
		out: String::new(),
		options,
	};

	emitter.write_root(value);
	emitter.out
}

struct Emitter<'a> {
	out: String,
	options: &'a EmitterOptions,
}

fn is_block(value: &Value) -> bool {
	match value {
		Value::Mapping(map) => !map.is_empty(),
		Value::Sequence(seq) => !seq.is_empty(),
		_ => false,
	}
}

impl Emitter<'_> {
	fn pad(&mut self, indent: usize) {
		self.out.extend(std::iter::repeat_n(' ', indent));
	}

	/// The inline form of a value, for anything that is not a non-empty collection.
	fn inline(&self, value: &Value) -> String {
		match value {
			Value::Null => "null".to_string(),
			Value::Bool(b) => b.to_string(),
			Value::Number(n) => n.to_string(),
			Value::String(s) => present_str(s, self.options.mode).render(),
			Value::Sequence(_) => "[]".to_string(),
			Value::Mapping(_) => "{}".to_string(),
			Value::Tagged(tagged) => format!("{} {}", tagged.tag, self.inline(&tagged.value)),
		}
	}

	fn write_root(&mut self, value: &Value) {
		match value {
			Value::Mapping(map) if !map.is_empty() => self.write_mapping(map, 0, false),
			Value::Sequence(seq) if !seq.is_empty() => self.write_sequence(seq, 0, false),
			Value::Tagged(tagged) if is_block(&tagged.value) => {
				self.out.push_str(&tagged.tag.to_string());
				self.out.push('\n');
				self.write_root(&tagged.value);
			}
			other => {
				let text = self.inline(other);
				self.out.push_str(&text);
				self.out.push('\n');
			}
		}
	}

	fn entries<'m>(&self, map: &'m Mapping) -> Vec<(&'m Value, &'m Value)> {
		let mut entries: Vec<_> = map.iter().collect();

		if self.options.sort_keys {
			entries.sort_by_cached_key(|(key, _)| match key {
				Value::String(s) => s.clone(),
				other => self.inline(other),
			});
		}

		entries
	}

	/// Writes a non-empty mapping. With `inline_first`, the cursor is already placed where the
	/// first key goes.
	fn write_mapping(&mut self, map: &Mapping, indent: usize, inline_first: bool) {
		for (i, (key, value)) in self.entries(map).into_iter().enumerate() {
			if i > 0 || !inline_first {
				self.pad(indent);
			}

			if is_block(key) || matches!(key, Value::Tagged(t) if is_block(&t.value)) {
				self.out.push('?');
				self.write_item(key, indent);
				self.pad(indent);
				self.out.push(':');
				self.write_item(value, indent);
			} else {
				let key = self.inline(key);
				self.out.push_str(&key);
				self.out.push(':');
				self.write_mapping_value(value, indent);
			}
		}
	}

	fn write_mapping_value(&mut self, value: &Value, indent: usize) {
		match value {
			Value::Mapping(map) if !map.is_empty() => {
				self.out.push('\n');
				self.write_mapping(map, indent + self.options.indent, false);
			}
			Value::Sequence(seq) if !seq.is_empty() => {
				self.out.push('\n');
				self.write_sequence(seq, indent, false);
			}
			Value::Tagged(tagged) if is_block(&tagged.value) => {
				self.write_tag(tagged);
				self.write_mapping_value(&tagged.value, indent);
			}
			other => {
				let text = self.inline(other);
				self.out.push(' ');
				self.out.push_str(&text);
				self.out.push('\n');
			}
		}
	}

	fn write_sequence(&mut self, seq: &[Value], indent: usize, inline_first: bool) {
		for (i, item) in seq.iter().enumerate() {
			if i > 0 || !inline_first {
				self.pad(indent);
			}

			self.out.push('-');
			self.write_item(item, indent);
		}
	}

	/// Writes what follows a `-` or `?` indicator at `indent`.
	fn write_item(&mut self, value: &Value, indent: usize) {
		match value {
			Value::Mapping(map) if !map.is_empty() => {
				self.out.push(' ');
				self.write_mapping(map, indent + 2, true);
			}
			Value::Sequence(seq) if !seq.is_empty() => {
				self.out.push(' ');
				self.write_sequence(seq, indent + 2, true);
			}
			Value::Tagged(tagged) if is_block(&tagged.value) => {
				self.write_tag(tagged);
				self.pad(indent + 2);
				self.write_item_body(&tagged.value, indent + 2);
			}
			other => {
				let text = self.inline(other);
				self.out.push(' ');
				self.out.push_str(&text);
				self.out.push('\n');
			}
		}
	}

	fn write_item_body(&mut self, value: &Value, indent: usize) {
		match value {
			Value::Mapping(map) => self.write_mapping(map, indent, true),
			Value::Sequence(seq) => self.write_sequence(seq, indent, true),
			other => self.write_item(other, indent),
		}
	}

	fn write_tag(&mut self, tagged: &TaggedValue) {
		self.out.push(' ');
		self.out.push_str(&tagged.tag.to_string());
		self.out.push('\n');
	}
}
