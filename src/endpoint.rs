//! OpenID service endpoints built from XRDS services or HTML `<link>` tags.

// self
use crate::{
	_prelude::*,
	error::FilterError,
	html::{find_first_href, parse_link_attrs},
	yadis::{BasicServiceEndpoint, EndpointPrototype, Filter, ServiceElement},
};

/// OP identifier (directed identity) service type.
pub const OPENID_IDP_2_0_TYPE: &str = "http://specs.openid.net/auth/2.0/server";
/// OpenID 2.0 claimed identifier service type.
pub const OPENID_2_0_TYPE: &str = "http://specs.openid.net/auth/2.0/signon";
/// OpenID 1.1 service type.
pub const OPENID_1_1_TYPE: &str = "http://openid.net/signon/1.1";
/// OpenID 1.0 service type.
pub const OPENID_1_0_TYPE: &str = "http://openid.net/signon/1.0";
/// Every service type an [`Endpoint`] can be built from.
pub const OPENID_TYPE_URIS: [&str; 4] =
	[OPENID_IDP_2_0_TYPE, OPENID_2_0_TYPE, OPENID_1_1_TYPE, OPENID_1_0_TYPE];

/// A discovered OpenID endpoint.
///
/// Endpoints are immutable once built: fields are read through accessors and only the
/// constructors below (and XRI discovery, which stamps the CanonicalID) produce values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
	claimed_identifier: Option<String>,
	server_url: String,
	type_uris: Vec<String>,
	local_id: Option<String>,
	used_yadis: bool,
	display_identifier: Option<String>,
}
impl Endpoint {
	/// Builds an endpoint from its parts.
	pub fn new(
		claimed_identifier: Option<String>,
		server_url: impl Into<String>,
		type_uris: Vec<String>,
		local_id: Option<String>,
		used_yadis: bool,
	) -> Self {
		Self {
			claimed_identifier,
			server_url: server_url.into(),
			type_uris,
			local_id,
			used_yadis,
			display_identifier: None,
		}
	}

	/// Builds an endpoint from an XRDS service URI, or `Ok(None)` for non-OpenID services.
	///
	/// OP identifier services carry neither a claimed nor a local identifier. Other services claim
	/// the Yadis URL and take their local identifier from `openid:Delegate` (1.x types) or
	/// `LocalID` (2.0 type); disagreeing values are a [`FilterError`].
	pub fn from_basic_service_endpoint(
		endpoint: &BasicServiceEndpoint,
	) -> Result<Option<Self>, FilterError> {
		let type_uris = endpoint.match_types(&OPENID_TYPE_URIS);

		if type_uris.is_empty() || endpoint.uri.is_empty() {
			return Ok(None);
		}
		if type_uris.iter().any(|t| t == OPENID_IDP_2_0_TYPE) {
			return Ok(Some(Self::new(None, endpoint.uri.as_str(), type_uris, None, true)));
		}

		let local_id = find_op_local_identifier(&endpoint.service, &type_uris)?;

		Ok(Some(Self::new(
			Some(endpoint.yadis_url.clone()),
			endpoint.uri.as_str(),
			type_uris,
			local_id,
			true,
		)))
	}

	/// Builds endpoints from `<link rel=...>` tags of an HTML page at `uri`.
	///
	/// `openid2.provider` yields a 2.0 endpoint and `openid.server` a 1.1 endpoint, each with the
	/// matching local-identifier link when present.
	pub fn from_html(uri: &str, html: &str) -> Vec<Self> {
		let links = parse_link_attrs(html);
		let discovery_types = [
			(OPENID_2_0_TYPE, "openid2.provider", "openid2.local_id"),
			(OPENID_1_1_TYPE, "openid.server", "openid.delegate"),
		];

		discovery_types
			.into_iter()
			.filter_map(|(type_uri, provider_rel, local_id_rel)| {
				let server_url = find_first_href(&links, provider_rel)?;

				Some(Self::new(
					Some(uri.to_owned()),
					server_url,
					vec![type_uri.to_owned()],
					find_first_href(&links, local_id_rel).map(ToOwned::to_owned),
					false,
				))
			})
			.collect()
	}

	/// Endpoint for an OP endpoint URL used as an identifier directly.
	pub fn from_op_endpoint_url(op_endpoint_url: &str) -> Self {
		Self::new(None, op_endpoint_url, vec![OPENID_IDP_2_0_TYPE.to_owned()], None, false)
	}

	/// Identifier this endpoint can assert; `None` for OP identifiers.
	pub fn claimed_identifier(&self) -> Option<&str> {
		self.claimed_identifier.as_deref()
	}

	/// OP endpoint URL.
	pub fn server_url(&self) -> &str {
		&self.server_url
	}

	/// Service types, in document order.
	pub fn type_uris(&self) -> &[String] {
		&self.type_uris
	}

	/// Provider-local identifier, when it differs from the claimed one.
	pub fn local_id(&self) -> Option<&str> {
		self.local_id.as_deref()
	}

	/// Found through an XRDS document rather than HTML links.
	pub fn used_yadis(&self) -> bool {
		self.used_yadis
	}

	/// Re-issues the endpoint for an XRI: it claims `canonical_id` and displays `iname`.
	pub(crate) fn for_xri(self, canonical_id: &str, iname: &str) -> Self {
		Self {
			claimed_identifier: Some(canonical_id.to_owned()),
			display_identifier: Some(iname.to_owned()),
			..self
		}
	}

	/// Directed-identity endpoint.
	pub fn is_op_identifier(&self) -> bool {
		self.has_type(OPENID_IDP_2_0_TYPE)
	}

	/// True when only OpenID 1.x is supported.
	pub fn compatibility_mode(&self) -> bool {
		!(self.has_type(OPENID_IDP_2_0_TYPE) || self.has_type(OPENID_2_0_TYPE))
	}

	/// True when the endpoint supports `type_uri`; OP identifiers also imply 2.0 signon.
	pub fn supports_type(&self, type_uri: &str) -> bool {
		self.has_type(type_uri) || (type_uri == OPENID_2_0_TYPE && self.is_op_identifier())
	}

	/// Local identifier, falling back to the claimed identifier.
	pub fn local_id_or_claimed(&self) -> Option<&str> {
		self.local_id.as_deref().or(self.claimed_identifier.as_deref())
	}

	/// Identifier to show users: the display identifier, else the claimed one without fragment.
	pub fn display_identifier(&self) -> Option<&str> {
		self.display_identifier.as_deref().or_else(|| {
			self.claimed_identifier.as_deref().map(|claimed| claimed.split('#').next().unwrap_or(claimed))
		})
	}

	fn has_type(&self, type_uri: &str) -> bool {
		self.type_uris.iter().any(|t| t == type_uri)
	}
}
impl EndpointPrototype<Endpoint> for Endpoint {
	fn from_basic_service_endpoint(
		&self,
		endpoint: &BasicServiceEndpoint,
	) -> Result<Option<Endpoint>, FilterError> {
		Endpoint::from_basic_service_endpoint(endpoint)
	}
}

/// Filter producing OpenID [`Endpoint`]s from XRDS services.
pub fn openid_filter() -> Filter<Endpoint> {
	Filter::from_fn(Endpoint::from_basic_service_endpoint)
}

/// Extracts the provider-local identifier of `service` for the given OpenID `type_uris`.
pub fn find_op_local_identifier(
	service: &ServiceElement,
	type_uris: &[String],
) -> Result<Option<String>, FilterError> {
	let has = |t: &str| type_uris.iter().any(|u| u == t);
	let mut candidates: Vec<(&str, &[String])> = Vec::new();

	if has(OPENID_1_1_TYPE) || has(OPENID_1_0_TYPE) {
		candidates.push(("openid:Delegate", &service.delegates));
	}
	if has(OPENID_2_0_TYPE) {
		candidates.push(("xrd:LocalID", &service.local_ids));
	}

	let mut local_id: Option<&String> = None;

	for (tag, values) in candidates {
		for value in values {
			match local_id {
				None => local_id = Some(value),
				Some(existing) if existing != value =>
					return Err(FilterError::new(format!(
						"More than one {tag} tag found in one service element"
					))),
				Some(_) => {},
			}
		}
	}

	Ok(local_id.cloned())
}
