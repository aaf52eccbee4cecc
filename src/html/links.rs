//! `<link rel=...>` extraction for HTML-based OpenID discovery.

// self
use crate::{
	_prelude::*,
	html::{HtmlTokenizer, ScanStep, TagScanner},
};

/// Attributes of one `<link>` tag, values unescaped.
pub type LinkAttrs = BTreeMap<String, String>;

/// Collects the attributes of every `<link>` inside `<html><head>`.
///
/// Scanning stops at `</head>`, `<body>`, `</body>`, `</html>`, a second `<head>`, a nested
/// `<html>` inside the head, or the first malformed tag; links seen until then are kept.
pub fn parse_link_attrs(html: &str) -> Vec<LinkAttrs> {
	let mut scanner = HtmlTokenizer::new(html);
	let mut links = Vec::new();
	let mut in_html = false;
	let mut in_head = false;
	let mut saw_head = false;

	loop {
		let tag = match scanner.next_tag(&["head", "/head", "link", "body", "/body", "html", "/html"]) {
			ScanStep::Tag(tag) => tag,
			ScanStep::End => break,
			ScanStep::Malformed => {
				crate::obs::log_html_scan_stopped("link");

				break;
			},
		};

		if matches!(tag.name.as_str(), "/head" | "body" | "/body" | "/html") {
			break;
		}
		if tag.name == "html" {
			in_html = true;
		}
		if !in_html {
			continue;
		}
		if tag.name == "head" {
			if saw_head {
				break;
			}

			saw_head = true;
			in_head = !tag.self_closing;
		}
		if !in_head {
			continue;
		}
		if tag.name == "html" {
			break;
		}
		if tag.name == "link" {
			links.push(
				tag.attributes
					.into_iter()
					.map(|(name, value)| (name, openid_unescape(&value)))
					.collect(),
			);
		}
	}

	links
}

/// True when whitespace-separated `rel_attr` contains `target_rel`, ignoring case.
pub fn rel_matches(rel_attr: &str, target_rel: &str) -> bool {
	rel_attr.split_whitespace().any(|rel| rel.to_lowercase() == target_rel)
}

/// True when the link's `rel` names `target_rel`.
pub fn link_has_rel(link: &LinkAttrs, target_rel: &str) -> bool {
	link.get("rel").is_some_and(|rel| rel_matches(rel, target_rel))
}

/// Links whose `rel` names `target_rel`, in document order.
pub fn find_links_rel<'a>(links: &'a [LinkAttrs], target_rel: &str) -> Vec<&'a LinkAttrs> {
	links.iter().filter(|link| link_has_rel(link, target_rel)).collect()
}

/// `href` of the first link whose `rel` names `target_rel`.
pub fn find_first_href<'a>(links: &'a [LinkAttrs], target_rel: &str) -> Option<&'a str> {
	find_links_rel(links, target_rel).into_iter().next()?.get("href").map(String::as_str)
}

/// Undoes the four entity escapes OpenID link values are expected to use.
pub fn openid_unescape(value: &str) -> String {
	value.replace("&amp;", "&").replace("&lt;", "<").replace("&gt;", ">").replace("&quot;", "\"")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn links_are_read_from_head_only() {
		let html = r#"<html><head>
<link rel="openid.server" href="http://www.myopenid.com/server?a=1&amp;b=2">
<link REL="OpenID2.Provider other" href='http://op.example.com/'>
<!-- <link rel="openid.delegate" href="http://commented/"> -->
</head><body><link rel="openid.delegate" href="http://body/"></body></html>"#;
		let links = parse_link_attrs(html);

		assert_eq!(links.len(), 2);
		assert_eq!(find_first_href(&links, "openid.server"), Some("http://www.myopenid.com/server?a=1&b=2"));
		assert_eq!(find_first_href(&links, "openid2.provider"), Some("http://op.example.com/"));
		assert_eq!(find_first_href(&links, "openid.delegate"), None);
	}

	#[test]
	fn links_outside_html_or_after_second_head_are_ignored() {
		assert!(parse_link_attrs(r#"<head><link rel="x" href="y"></head>"#).is_empty());
		assert_eq!(
			parse_link_attrs(
				r#"<html><head><link rel="a" href="1"></head><head><link rel="b" href="2">"#
			)
			.len(),
			1
		);
		assert_eq!(
			parse_link_attrs(r#"<html><head><link rel="a" href="1"><head><link rel="b" href="2">"#)
				.len(),
			1
		);
		assert!(parse_link_attrs(r#"<html><head/><link rel="a" href="1">"#).is_empty());
	}

	#[test]
	fn rel_matching_is_token_based() {
		assert!(rel_matches("  openid.server  openid2.provider ", "openid2.provider"));
		assert!(!rel_matches("openid.serverx", "openid.server"));

		let link = LinkAttrs::from([("href".into(), "x".into())]);

		assert!(!link_has_rel(&link, "openid.server"));
	}

	#[test]
	fn openid_unescape_handles_basic_entities() {
		assert_eq!(openid_unescape("a&amp;b&lt;c&gt;&quot;"), "a&b<c>\"");
	}
}
