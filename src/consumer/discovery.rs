//! OpenID identifier discovery: URLs through Yadis with an HTML fallback, XRIs through a proxy
//! resolver.

// self
use crate::{
	_prelude::*,
	endpoint::{Endpoint, OPENID_IDP_2_0_TYPE, OPENID_TYPE_URIS, openid_filter},
	error::DiscoveryFailure,
	http::{FetchRequest, Fetcher},
	obs::{self, DiscoveryKind, EndpointSource},
	urinorm,
	yadis::{
		self, ProxyResolver,
		filter::apply_filter,
		xri::{IdentifierScheme, identifier_scheme},
	},
};

/// Normalizes an identifier URL and drops its fragment.
pub fn normalize_url(url: &str) -> Result<String> {
	let mut normalized = urinorm::normalize(url)?;

	if let Some(fragment_start) = normalized.find('#') {
		normalized.truncate(fragment_start);
	}

	Ok(normalized)
}

/// Discovers the OpenID endpoints of `identifier`, an XRI or a URL.
///
/// Returns the claimed identifier discovery settled on with its endpoints, OP identifier
/// endpoints first when any exist.
pub async fn discover(
	fetcher: &dyn Fetcher,
	resolver: &ProxyResolver,
	identifier: &str,
) -> Result<(String, Vec<Endpoint>)> {
	match identifier_scheme(identifier) {
		IdentifierScheme::Xri => discover_xri(fetcher, resolver, identifier).await,
		IdentifierScheme::Uri => discover_uri(fetcher, identifier).await,
	}
}

/// Discovers a URL identifier; a bare host gains `http://`.
///
/// Yadis runs first. Without OpenID services in an XRDS, the endpoints come from the page's
/// `<link>` tags; when Yadis led to an XRDS document, the original URL is fetched again for
/// them.
pub async fn discover_uri(fetcher: &dyn Fetcher, uri: &str) -> Result<(String, Vec<Endpoint>)> {
	let uri = with_http_scheme(uri)?;
	let normalized = normalize_url(&uri)?;

	obs::observe(DiscoveryKind::Yadis, "discover_uri", discover_normalized_uri(fetcher, normalized))
		.await
}

/// Resolves an XRI through `resolver` and returns its CanonicalID with the OpenID endpoints.
///
/// Every endpoint claims the CanonicalID and displays the XRI. A missing CanonicalID or a
/// forged authority chain fails with [`crate::error::XrdsError`].
pub async fn discover_xri(
	fetcher: &dyn Fetcher,
	resolver: &ProxyResolver,
	iname: &str,
) -> Result<(String, Vec<Endpoint>)> {
	let iname = iname.strip_prefix("xri://").unwrap_or(iname);

	obs::observe(DiscoveryKind::Xri, "discover_xri", resolve_xri(fetcher, resolver, iname)).await
}

/// OP identifier endpoints when there are any, else all endpoints ordered by OpenID version.
pub fn get_op_or_user_services(services: Vec<Endpoint>) -> Vec<Endpoint> {
	let op_services = services.iter().filter(|s| s.is_op_identifier()).cloned().collect::<Vec<_>>();

	if op_services.is_empty() { arrange_by_type(services, &OPENID_TYPE_URIS) } else { op_services }
}

/// Stable-sorts `services` by the first of `preferred_types` each supports; others go last.
pub fn arrange_by_type(mut services: Vec<Endpoint>, preferred_types: &[&str]) -> Vec<Endpoint> {
	services.sort_by_key(|service| {
		preferred_types
			.iter()
			.position(|preferred| service.type_uris().iter().any(|t| t == preferred))
			.unwrap_or(preferred_types.len())
	});

	services
}

fn with_http_scheme(uri: &str) -> Result<String> {
	match uri.split_once("://") {
		Some((scheme, rest)) if is_scheme(scheme) && !rest.is_empty() => {
			if !matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https") {
				return Err(DiscoveryFailure::new(uri, "URI scheme is not HTTP or HTTPS").into());
			}

			Ok(uri.to_owned())
		},
		_ => Ok(format!("http://{uri}")),
	}
}

fn is_scheme(scheme: &str) -> bool {
	scheme.starts_with(|c: char| c.is_ascii_alphabetic())
		&& scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

async fn discover_normalized_uri(
	fetcher: &dyn Fetcher,
	uri: String,
) -> Result<(String, Vec<Endpoint>)> {
	let result = yadis::discover(fetcher, &uri).await?;
	let yadis_url = result.normalized_url.clone();
	let services = if result.is_xrds() {
		match apply_filter(&yadis_url, &result.response_text, &openid_filter()) {
			Ok(services) => services,
			Err(Error::Xrds(e)) if !e.is_fraud() => Vec::new(),
			Err(e) => return Err(e),
		}
	} else {
		Vec::new()
	};

	if !services.is_empty() {
		obs::record_endpoints_found(EndpointSource::Yadis, services.len());

		return Ok((normalize_url(&yadis_url)?, get_op_or_user_services(services)));
	}
	if result.is_xrds() {
		return discover_no_yadis(fetcher, &uri).await;
	}

	let services = Endpoint::from_html(&yadis_url, &result.response_text);

	obs::record_endpoints_found(EndpointSource::Html, services.len());

	Ok((normalize_url(&yadis_url)?, get_op_or_user_services(services)))
}

async fn discover_no_yadis(fetcher: &dyn Fetcher, uri: &str) -> Result<(String, Vec<Endpoint>)> {
	let response =
		fetcher.fetch(FetchRequest::get(uri)).await.map_err(|e| DiscoveryFailure::new(uri, e))?;

	if !matches!(response.status, 200 | 206) {
		return Err(DiscoveryFailure::new(
			uri,
			format!("HTTP response status was {}, expected 200 or 206", response.status),
		)
		.with_status(response.status)
		.into());
	}

	let claimed_id = normalize_url(&response.final_url)?;
	let services = Endpoint::from_html(&claimed_id, &response.body);

	obs::record_endpoints_found(EndpointSource::Html, services.len());

	Ok((claimed_id, get_op_or_user_services(services)))
}

async fn resolve_xri(
	fetcher: &dyn Fetcher,
	resolver: &ProxyResolver,
	iname: &str,
) -> Result<(String, Vec<Endpoint>)> {
	let (canonical_id, mut services) = resolver.query(fetcher, iname).await?;
	let canonical_id = canonical_id
		.ok_or_else(|| crate::error::XrdsError::MissingCanonicalId { iname: iname.to_owned() })?;
	let filter = openid_filter();
	let mut endpoints = Vec::new();

	services.sort_by_key(|service| service.priority.unwrap_or(0));

	for service in &services {
		endpoints.extend(
			filter
				.get_service_endpoints(iname, service)
				.map_err(|e| DiscoveryFailure::new(iname, e))?
				.into_iter()
				.map(|endpoint| endpoint.for_xri(&canonical_id, iname)),
		);
	}

	obs::record_endpoints_found(EndpointSource::Xri, endpoints.len());

	Ok((iname.to_owned(), get_op_or_user_services(endpoints)))
}
