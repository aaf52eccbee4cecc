//! Minimal HTML tag scanning.
//!
//! Discovery never needs a DOM: it only walks a handful of tags near the top of a document
//! (`html`, `head`, `meta`, `link`, `body`). [`TagScanner`] yields those tags one at a time and
//! reports malformed markup as an explicit [`ScanStep::Malformed`] so callers stop cleanly.

pub mod links;

pub use links::*;

// std
use std::sync::LazyLock;
// crates.io
use regex::{Captures, Regex};
// self
use crate::_prelude::*;

static REMOVED_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?is)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<script\b[^:>][^>]*>.*?</script>|<script>.*?</script>")
		.expect("Removal pattern must compile.")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r#"^<(/?)([A-Za-z][A-Za-z0-9:_.\-]*)((?:\s+[^\s"'=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+))?)*)\s*(/?)\s*>"#,
	)
	.expect("Tag pattern must compile.")
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"([^\s"'=/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#)
		.expect("Attribute pattern must compile.")
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"&(#[xX][0-9A-Fa-f]+|#[0-9]+|amp|lt|gt|quot|apos);").expect("Entity pattern must compile.")
});

/// One scanned tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HtmlTag {
	/// Lower-cased name; closing tags are prefixed with `/`.
	pub name: String,
	/// Attributes keyed by lower-cased name, values as written.
	pub attributes: BTreeMap<String, String>,
	/// Tag ended with `/>`.
	pub self_closing: bool,
}
impl HtmlTag {
	/// Looks up an attribute by lower-case name.
	pub fn attr(&self, name: &str) -> Option<&str> {
		self.attributes.get(name).map(String::as_str)
	}
}

/// Result of asking a scanner for the next interesting tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanStep {
	/// Next tag whose name is in the requested set.
	Tag(HtmlTag),
	/// No further matching tag.
	End,
	/// Markup could not be tokenized; scanning should stop.
	Malformed,
}

/// Source of HTML tags.
pub trait TagScanner {
	/// Advances to the next tag whose name is in `names` (lower-case, `/x` for closing tags).
	fn next_tag(&mut self, names: &[&str]) -> ScanStep;
}

/// Regex-backed [`TagScanner`].
///
/// Comments, CDATA sections, and script bodies are removed up front so tags inside them are
/// never reported.
#[derive(Clone, Debug)]
pub struct HtmlTokenizer {
	html: String,
	pos: usize,
}
impl HtmlTokenizer {
	/// Prepares `html` for scanning.
	pub fn new(html: &str) -> Self {
		Self { html: REMOVED_RE.replace_all(html, "").into_owned(), pos: 0 }
	}

	fn next_any(&mut self) -> ScanStep {
		loop {
			let Some(offset) = self.html[self.pos..].find('<') else {
				self.pos = self.html.len();

				return ScanStep::End;
			};
			let start = self.pos + offset;
			let rest = &self.html[start..];
			let mut chars = rest.chars().skip(1);
			let opens_tag = match chars.next() {
				Some('/') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
				Some(c) => c.is_ascii_alphabetic(),
				None => false,
			};

			if !opens_tag {
				self.pos = start + 1;

				if rest.starts_with("<!") || rest.starts_with("<?") {
					match rest.find('>') {
						Some(end) => self.pos = start + end + 1,
						None => return ScanStep::Malformed,
					}
				}

				continue;
			}

			let Some(captures) = TAG_RE.captures(rest) else {
				self.pos = self.html.len();

				return ScanStep::Malformed;
			};

			self.pos = start + captures[0].len();

			return ScanStep::Tag(build_tag(&captures));
		}
	}
}
impl TagScanner for HtmlTokenizer {
	fn next_tag(&mut self, names: &[&str]) -> ScanStep {
		loop {
			match self.next_any() {
				ScanStep::Tag(tag) if names.contains(&tag.name.as_str()) => return ScanStep::Tag(tag),
				ScanStep::Tag(_) => continue,
				step => return step,
			}
		}
	}
}

/// Decodes the HTML character references that appear in attribute values.
///
/// Unknown or out-of-range references are left untouched.
pub fn unescape_html(value: &str) -> String {
	ENTITY_RE
		.replace_all(value, |captures: &Captures| {
			let entity = &captures[1];
			let decoded = match entity {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" => Some('\''),
				_ if entity.starts_with("#x") || entity.starts_with("#X") =>
					u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32),
				_ => entity[1..].parse().ok().and_then(char::from_u32),
			};

			decoded.map_or_else(|| captures[0].to_owned(), String::from)
		})
		.into_owned()
}

fn build_tag(captures: &Captures) -> HtmlTag {
	let closing = &captures[1];
	let name = format!("{closing}{}", captures[2].to_ascii_lowercase());
	let attributes = ATTR_RE
		.captures_iter(&captures[3])
		.map(|attr| {
			let value = attr
				.get(2)
				.or_else(|| attr.get(3))
				.or_else(|| attr.get(4))
				.map(|m| m.as_str().to_owned())
				.unwrap_or_default();

			(attr[1].to_ascii_lowercase(), value)
		})
		.collect();

	HtmlTag { name, attributes, self_closing: !captures[4].is_empty() }
}
