//! `Accept` header generation, parsing, and content-type ranking.

// self
use crate::_prelude::*;

/// Preference factor outside `(0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, ThisError)]
#[error("Invalid preference factor: {quality}.")]
pub struct InvalidPreference {
	/// Rejected quality value.
	pub quality: f64,
}

/// One entry passed to [`generate_accept_header`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Preference<'a> {
	/// Media type such as `application/xrds+xml`.
	pub media_type: &'a str,
	/// Explicit quality; `None` means 1.0.
	pub quality: Option<f64>,
}
impl<'a> From<&'a str> for Preference<'a> {
	fn from(media_type: &'a str) -> Self {
		Self { media_type, quality: None }
	}
}
impl<'a> From<(&'a str, f64)> for Preference<'a> {
	fn from((media_type, quality): (&'a str, f64)) -> Self {
		Self { media_type, quality: Some(quality) }
	}
}

/// Parsed `main/sub; q=` entry of an `Accept` header.
#[derive(Clone, Debug, PartialEq)]
pub struct AcceptEntry {
	/// Main type, possibly `*`.
	pub main: String,
	/// Subtype, possibly `*`.
	pub sub: String,
	/// Quality in `[0, 1]`.
	pub quality: f64,
}

/// Builds an `Accept` header value from preferences.
///
/// Entries are ordered by their formatted quality and then by type, so lower-preference types come
/// first; entries at quality 1.0 carry no `q` parameter.
pub fn generate_accept_header<'a, I, P>(entries: I) -> Result<String, InvalidPreference>
where
	I: IntoIterator<Item = P>,
	P: Into<Preference<'a>>,
{
	let mut parts = Vec::new();

	for entry in entries {
		let Preference { media_type, quality } = entry.into();
		let qs = match quality {
			None => "1.0".to_owned(),
			Some(quality) if quality > 0. && quality <= 1. => format!("{quality:.1}"),
			Some(quality) => return Err(InvalidPreference { quality }),
		};

		parts.push((qs, media_type));
	}

	parts.sort();

	let chunks = parts
		.into_iter()
		.map(|(qs, media_type)| {
			if qs == "1.0" { media_type.to_owned() } else { format!("{media_type}; q={qs}") }
		})
		.collect::<Vec<_>>();

	Ok(chunks.join(", "))
}

/// Parses an `Accept` header, ignoring extensions other than `q`.
///
/// Tokens that are not `main/sub` are dropped. A missing or unparsable `q` counts as 1.0. The
/// result is ordered by descending quality; equal qualities keep header order.
pub fn parse_accept_header(value: &str) -> Vec<AcceptEntry> {
	let mut accepted = Vec::new();

	for chunk in value.split(',') {
		let mut params = chunk.split(';').map(str::trim);
		let Some(media_type) = params.next() else { continue };
		let Some((main, sub)) = media_type.split_once('/') else { continue };
		let quality = params
			.filter_map(|param| param.split_once('='))
			.filter(|(key, _)| key.trim() == "q")
			.filter_map(|(_, value)| value.trim().parse::<f64>().ok())
			.next_back()
			.unwrap_or(1.);

		accepted.push(AcceptEntry { main: main.to_owned(), sub: sub.to_owned(), quality });
	}

	accepted.sort_by(|a, b| b.quality.total_cmp(&a.quality));

	accepted
}

/// Ranks `available` types against parsed preferences.
///
/// An empty preference list accepts everything at 1.0. Otherwise types fall back to `main/*` and
/// then to the `*/*` default (0.0 unless raised). Types at quality zero are dropped; the rest are
/// ordered by descending quality, ties keeping `available` order.
pub fn match_types<'a>(accepted: &[AcceptEntry], available: &[&'a str]) -> Vec<(&'a str, f64)> {
	let mut default: f64 = if accepted.is_empty() { 1. } else { 0. };
	let mut match_main = HashMap::<&str, f64>::new();
	let mut match_sub = HashMap::<(&str, &str), f64>::new();

	for entry in accepted {
		if entry.main == "*" {
			default = default.max(entry.quality);
		} else if entry.sub == "*" {
			let q = match_main.entry(entry.main.as_str()).or_insert(0.);

			*q = q.max(entry.quality);
		} else {
			let q = match_sub.entry((entry.main.as_str(), entry.sub.as_str())).or_insert(0.);

			*q = q.max(entry.quality);
		}
	}

	let mut ranked = available
		.iter()
		.filter_map(|&media_type| {
			let (main, sub) = media_type.split_once('/').unwrap_or((media_type, ""));
			let quality = match_sub
				.get(&(main, sub))
				.or_else(|| match_main.get(main))
				.copied()
				.unwrap_or(default);

			(quality != 0.).then_some((media_type, quality))
		})
		.collect::<Vec<_>>();

	ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

	ranked
}

/// Returns the acceptable subset of `available` in preference order.
pub fn get_acceptable<'a>(accept_header: &str, available: &[&'a str]) -> Vec<&'a str> {
	match_types(&parse_accept_header(accept_header), available)
		.into_iter()
		.map(|(media_type, _)| media_type)
		.collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn generate_orders_by_quality_and_omits_unit_quality() {
		let header = generate_accept_header([
			Preference::from(("text/html", 0.3)),
			Preference::from(("application/xhtml+xml", 0.5)),
			Preference::from("application/xrds+xml"),
		])
		.expect("Preferences are within range.");

		assert_eq!(header, "text/html; q=0.3, application/xhtml+xml; q=0.5, application/xrds+xml");
	}

	#[test]
	fn generate_rejects_out_of_range_quality() {
		assert_eq!(
			generate_accept_header([("text/html", 0.)]),
			Err(InvalidPreference { quality: 0. })
		);
		assert!(generate_accept_header([("text/html", 1.5)]).is_err());
	}

	#[test]
	fn parse_sorts_by_descending_quality_and_drops_junk() {
		let parsed = parse_accept_header("text/plain; q=0.5, junk, text/html, image/*; q=bogus");

		assert_eq!(
			parsed,
			vec![
				AcceptEntry { main: "text".into(), sub: "html".into(), quality: 1. },
				AcceptEntry { main: "image".into(), sub: "*".into(), quality: 1. },
				AcceptEntry { main: "text".into(), sub: "plain".into(), quality: 0.5 },
			]
		);
	}

	#[test]
	fn generated_header_round_trips_quality_order() {
		let header =
			generate_accept_header([("a/b", 0.2), ("c/d", 0.9), ("e/f", 0.5)]).expect("Valid preferences.");
		let parsed = parse_accept_header(&header);
		let order = parsed.iter().map(|e| format!("{}/{}", e.main, e.sub)).collect::<Vec<_>>();

		assert_eq!(order, ["c/d", "e/f", "a/b"]);
	}

	#[test]
	fn match_types_accepts_everything_for_empty_list() {
		assert_eq!(match_types(&[], &["text/html"]), vec![("text/html", 1.)]);
	}

	#[test]
	fn match_types_uses_wildcards_and_keeps_ties_in_order() {
		let accepted = parse_accept_header("text/html, text/plain; q=0.5, image/*; q=0.7");

		assert_eq!(
			match_types(&accepted, &["text/plain", "image/png", "text/html", "video/mp4"]),
			vec![("text/html", 1.), ("image/png", 0.7), ("text/plain", 0.5)]
		);

		let accepted = parse_accept_header("*/*; q=0.1, text/html");

		assert_eq!(
			match_types(&accepted, &["a/b", "text/html", "c/d"]),
			vec![("text/html", 1.), ("a/b", 0.1), ("c/d", 0.1)]
		);
	}

	#[test]
	fn get_acceptable_returns_names_only() {
		assert_eq!(
			get_acceptable("application/xrds+xml, text/html; q=0.3", &["text/html", "application/xrds+xml"]),
			["application/xrds+xml", "text/html"]
		);
	}
}
