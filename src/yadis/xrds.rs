//! XRDS document model.
//!
//! Documents are parsed once into an owned tree of [`Xrd`] records. Services are always read from
//! the last `XRD`; earlier ones only exist to carry the CanonicalID authority chain checked by
//! [`XrdsDocument::canonical_id`]. DTDs are rejected at parse time, so entity expansion never runs.

// crates.io
use roxmltree::{Document, Node, ParsingOptions};
// self
use crate::{
	_prelude::*,
	error::XrdsError,
	yadis::xri::{make_xri, provider_is_authoritative, root_authority},
};

/// XRDS envelope namespace.
pub const XRDS_NS: &str = "xri://$xrds";
/// XRD 2.0 namespace.
pub const XRD_NS_2_0: &str = "xri://$xrd*($v*2.0)";
/// OpenID 1.x extension namespace carrying `openid:Delegate`.
pub const OPENID_1_0_NS: &str = "http://openid.net/xmlns/1.0";

/// Parsed XRDS document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XrdsDocument {
	xrds: Vec<Xrd>,
}
impl XrdsDocument {
	/// All `XRD` records in document order.
	pub fn xrds(&self) -> &[Xrd] {
		&self.xrds
	}

	/// Services of the last `XRD`, in document order.
	pub fn services(&self) -> Result<&[ServiceElement], XrdsError> {
		self.xrds.last().map(|xrd| xrd.services.as_slice()).ok_or(XrdsError::MissingXrd)
	}

	/// Returns the CanonicalID of the last `XRD` after checking its authority chain.
	///
	/// Each earlier `XRD` must hold the parent of the identifier below it (the identifier with its
	/// last `!` segment removed, compared case-insensitively), and the top of the chain must be
	/// issued by the root authority of `iname`. A break anywhere is [`XrdsError::Fraud`]. The
	/// value is returned as written in the document; `None` when the last `XRD` has none.
	pub fn canonical_id(&self, iname: &str) -> Result<Option<String>, XrdsError> {
		let mut chain = self.xrds.iter().rev();
		let Some(candidate) = chain.next().and_then(|xrd| xrd.canonical_id.as_deref()) else {
			return Ok(None);
		};
		let mut child_id = make_xri(candidate).to_lowercase();

		for xrd in chain {
			let parent = xrd.canonical_id.as_deref().map(make_xri).unwrap_or_default();
			let Some((parent_sought, _)) = child_id.rsplit_once('!') else {
				return Err(XrdsError::Fraud { claimed: child_id, authority: parent });
			};

			if parent_sought != parent.to_lowercase() {
				return Err(XrdsError::Fraud { claimed: parent_sought.to_owned(), authority: parent });
			}

			child_id = parent_sought.to_owned();
		}

		let root = root_authority(iname).to_lowercase();

		if !provider_is_authoritative(&root, &child_id) {
			return Err(XrdsError::Fraud { claimed: child_id, authority: root });
		}

		Ok(Some(candidate.to_owned()))
	}
}

/// One `XRD` element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Xrd {
	/// Text of the first `CanonicalID` child.
	pub canonical_id: Option<String>,
	/// `Service` children in document order.
	pub services: Vec<ServiceElement>,
}

/// One `Service` element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceElement {
	/// `priority` attribute, when numeric.
	pub priority: Option<i64>,
	/// `Type` texts in document order.
	pub types: Vec<String>,
	/// `URI` children in document order.
	pub uris: Vec<ServiceUri>,
	/// `LocalID` texts.
	pub local_ids: Vec<String>,
	/// `openid:Delegate` texts.
	pub delegates: Vec<String>,
}
impl ServiceElement {
	/// URIs in ascending priority; a missing priority sorts as 0 and ties keep document order.
	pub fn sorted_uris(&self) -> Vec<&ServiceUri> {
		let mut uris = self.uris.iter().collect::<Vec<_>>();

		uris.sort_by_key(|uri| uri.priority.unwrap_or(0));

		uris
	}
}

/// `URI` child of a service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUri {
	/// `priority` attribute, when numeric.
	pub priority: Option<i64>,
	/// Trimmed URI text.
	pub uri: String,
}

/// Parses `text` into an [`XrdsDocument`].
pub fn parse(text: &str) -> Result<XrdsDocument, XrdsError> {
	let options = ParsingOptions { allow_dtd: false, ..Default::default() };
	let document = Document::parse_with_options(text, options)
		.map_err(|e| XrdsError::NotXrds { reason: e.to_string() })?;
	let root = document.root_element();

	if !is_element(root, XRDS_NS, "XRDS") {
		return Err(XrdsError::NotXrds { reason: "root element is not xrds:XRDS".into() });
	}

	let xrds = children(root, XRD_NS_2_0, "XRD")
		.map(|xrd| Xrd {
			canonical_id: children(xrd, XRD_NS_2_0, "CanonicalID").next().map(text_of),
			services: children(xrd, XRD_NS_2_0, "Service").map(parse_service).collect(),
		})
		.collect();

	Ok(XrdsDocument { xrds })
}

fn parse_service(node: Node) -> ServiceElement {
	ServiceElement {
		priority: priority_of(node),
		types: children(node, XRD_NS_2_0, "Type").map(text_of).collect(),
		uris: children(node, XRD_NS_2_0, "URI")
			.map(|uri| ServiceUri { priority: priority_of(uri), uri: text_of(uri) })
			.collect(),
		local_ids: children(node, XRD_NS_2_0, "LocalID").map(text_of).collect(),
		delegates: children(node, OPENID_1_0_NS, "Delegate").map(text_of).collect(),
	}
}

fn is_element(node: Node, namespace: &str, name: &str) -> bool {
	node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(namespace)
}

fn children<'a, 'input>(
	node: Node<'a, 'input>,
	namespace: &'static str,
	name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
	node.children().filter(move |child| is_element(*child, namespace, name))
}

fn text_of(node: Node) -> String {
	node.text().unwrap_or_default().trim().to_owned()
}

fn priority_of(node: Node) -> Option<i64> {
	node.attribute("priority").and_then(|p| p.trim().parse().ok())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn chain_document(first: &str, second: &str) -> String {
		format!(
			r#"<?xml version="1.0"?>
<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)">
  <XRD><Query>*example</Query><CanonicalID>{first}</CanonicalID></XRD>
  <XRD><Query>*sub</Query><CanonicalID>{second}</CanonicalID>
    <Service><Type>http://openid.net/signon/1.0</Type><URI>http://op.example.com/</URI></Service>
  </XRD>
</xrds:XRDS>"#
		)
	}

	#[test]
	fn canonical_id_chain_is_verified() {
		let document = parse(&chain_document("=!1000", "=!1000!2000")).expect("Fixture should parse.");

		assert_eq!(
			document.canonical_id("=example*sub").expect("Chain should verify."),
			Some("=!1000!2000".into())
		);

		let forged = parse(&chain_document("=!9999", "=!1000!2000")).expect("Fixture should parse.");
		let err = forged.canonical_id("=example*sub").expect_err("Forged chain must be rejected.");

		assert!(err.is_fraud());
	}

	#[test]
	fn canonical_id_checks_root_authority() {
		let document = parse(&chain_document("@!1000", "@!1000!2000")).expect("Fixture should parse.");

		assert!(document.canonical_id("=example*sub").expect_err("Wrong root.").is_fraud());
		assert!(document.canonical_id("@EXAMPLE*sub").is_ok());
	}

	#[test]
	fn missing_canonical_id_is_none() {
		let document = parse(
			r#"<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)"><XRD/></xrds:XRDS>"#,
		)
		.expect("Fixture should parse.");

		assert_eq!(document.canonical_id("=example"), Ok(None));
		assert_eq!(document.services(), Ok(&[][..]));
	}

	#[test]
	fn services_come_from_last_xrd_with_sorted_uris() {
		let document = parse(
			r#"<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)"
			xmlns:openid="http://openid.net/xmlns/1.0">
  <XRD><Service><Type>ignored</Type></Service></XRD>
  <XRD>
    <Service priority="10">
      <Type> http://openid.net/signon/1.1 </Type>
      <URI priority="2">http://b/</URI>
      <URI>http://first/</URI>
      <URI priority="2">http://c/</URI>
      <URI priority="1">http://a/</URI>
      <openid:Delegate>http://me/</openid:Delegate>
    </Service>
  </XRD>
</xrds:XRDS>"#,
		)
		.expect("Fixture should parse.");
		let services = document.services().expect("Document has an XRD.");

		assert_eq!(services.len(), 1);
		assert_eq!(services[0].priority, Some(10));
		assert_eq!(services[0].types, ["http://openid.net/signon/1.1"]);
		assert_eq!(services[0].delegates, ["http://me/"]);

		let uris = services[0].sorted_uris().into_iter().map(|u| u.uri.as_str()).collect::<Vec<_>>();

		assert_eq!(uris, ["http://first/", "http://a/", "http://b/", "http://c/"]);
	}

	#[test]
	fn rejects_non_xrds_input() {
		assert!(matches!(parse("not xml"), Err(XrdsError::NotXrds { .. })));
		assert!(matches!(parse("<XRDS/>"), Err(XrdsError::NotXrds { .. })));
		assert!(matches!(
			parse(r#"<!DOCTYPE x [<!ENTITY a "aaaa">]><xrds:XRDS xmlns:xrds="xri://$xrds"/>"#),
			Err(XrdsError::NotXrds { .. })
		));
		assert_eq!(
			parse(r#"<xrds:XRDS xmlns:xrds="xri://$xrds"/>"#).expect("Empty XRDS parses.").services(),
			Err(XrdsError::MissingXrd)
		);
	}
}
