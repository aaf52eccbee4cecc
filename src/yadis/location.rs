//! Yadis location sniffing inside HTML documents.

// self
use crate::{
	html::{HtmlTokenizer, ScanStep, TagScanner, unescape_html},
	obs,
};

const LOCATION_EQUIVS: [&str; 2] = ["x-xrds-location", "x-yadis-location"];

/// Finds a `<meta http-equiv="X-XRDS-Location">` (or `X-YADIS-Location`) inside `<head>`.
///
/// Scanning ends at `</head>`, `<body>`, `</body>`, a nested `<html>` inside the head, or the first
/// malformed tag; none of these is an error.
pub fn html_yadis_location(scanner: &mut dyn TagScanner) -> Option<String> {
	let mut in_head = false;

	loop {
		let tag = match scanner.next_tag(&["head", "/head", "meta", "body", "/body", "html", "script"]) {
			ScanStep::Tag(tag) => tag,
			ScanStep::End => return None,
			ScanStep::Malformed => {
				obs::log_html_scan_stopped("yadis");

				return None;
			},
		};

		if matches!(tag.name.as_str(), "/head" | "body" | "/body") {
			return None;
		}
		if tag.name == "head" && !tag.self_closing {
			in_head = true;
		}
		if !in_head {
			continue;
		}
		if tag.name == "script" && !tag.self_closing {
			match scanner.next_tag(&["/script"]) {
				ScanStep::Tag(_) => {},
				ScanStep::End => return None,
				ScanStep::Malformed => {
					obs::log_html_scan_stopped("yadis");

					return None;
				},
			}
		}
		if tag.name == "html" {
			return None;
		}
		if tag.name != "meta" {
			continue;
		}

		let Some(equiv) = tag.attr("http-equiv") else { continue };

		if !LOCATION_EQUIVS.contains(&equiv.to_ascii_lowercase().as_str()) {
			continue;
		}
		if let Some(content) = tag.attr("content") {
			return Some(unescape_html(content));
		}
	}
}

/// Runs [`html_yadis_location`] over `html` with the default tokenizer.
pub fn find_html_yadis_location(html: &str) -> Option<String> {
	html_yadis_location(&mut HtmlTokenizer::new(html))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn finds_location_in_head() {
		let html = r#"<html><head><title>x</title>
<meta http-equiv="X-XRDS-Location" content="http://example.com/xrds?a=1&amp;b=2">
</head></html>"#;

		assert_eq!(find_html_yadis_location(html).as_deref(), Some("http://example.com/xrds?a=1&b=2"));
		assert_eq!(
			find_html_yadis_location(
				"<html><head><meta http-equiv='x-yadis-location' content='http://y/'></head></html>"
			)
			.as_deref(),
			Some("http://y/")
		);
	}

	#[test]
	fn ignores_meta_outside_head() {
		assert_eq!(
			find_html_yadis_location(
				r#"<html><meta http-equiv="X-XRDS-Location" content="http://early/"><head></head></html>"#
			),
			None
		);
		assert_eq!(
			find_html_yadis_location(
				r#"<html><head></head><body><meta http-equiv="X-XRDS-Location" content="http://late/"></body></html>"#
			),
			None
		);
		assert_eq!(
			find_html_yadis_location(
				r#"<html><head/><meta http-equiv="X-XRDS-Location" content="http://short/"></html>"#
			),
			None
		);
	}

	#[test]
	fn other_meta_and_missing_content_are_skipped() {
		let html = r#"<html><head>
<meta http-equiv="Content-Type" content="text/html">
<meta http-equiv="X-XRDS-Location">
<meta http-equiv="X-XRDS-Location" content="http://found/">
</head></html>"#;

		assert_eq!(find_html_yadis_location(html).as_deref(), Some("http://found/"));
	}

	#[test]
	fn stops_on_nested_html_and_malformed_markup() {
		assert_eq!(
			find_html_yadis_location(
				r#"<html><head><html><meta http-equiv="X-XRDS-Location" content="http://x/">"#
			),
			None
		);
		assert_eq!(
			find_html_yadis_location(
				r#"<html><head><meta "bad"><meta http-equiv="X-XRDS-Location" content="http://x/">"#
			),
			None
		);
	}
}
