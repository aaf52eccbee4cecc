//! XRI resolution through an HTTP proxy resolver.

// self
use crate::{
	_prelude::*,
	error::DiscoveryFailure,
	http::{FetchRequest, Fetcher},
	yadis::{
		xrds::{self, ServiceElement},
		xri::{append_args, to_uri_normal},
	},
};

/// Public proxy used when none is configured.
pub const DEFAULT_PROXY: &str = "http://proxy.xri.net/";

/// Resolves XRIs by asking a proxy for their XRDS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyResolver {
	proxy_url: String,
}
impl ProxyResolver {
	/// Uses `proxy_url` as the resolver base; a trailing `/` is added when missing.
	pub fn new(proxy_url: impl Into<String>) -> Self {
		let mut proxy_url = proxy_url.into();

		if !proxy_url.ends_with('/') {
			proxy_url.push('/');
		}

		Self { proxy_url }
	}

	/// Resolver base URL.
	pub fn proxy_url(&self) -> &str {
		&self.proxy_url
	}

	/// Builds the proxy query URL for `xri`.
	///
	/// Without a service type the proxy is told to skip service endpoint selection (`sep=false`)
	/// and return the whole XRDS.
	pub fn query_url(&self, xri: &str, service_type: Option<&str>) -> String {
		let uri_normal = to_uri_normal(xri);
		let qxri = uri_normal.strip_prefix("xri://").unwrap_or(&uri_normal);
		let hxri = format!("{}{qxri}", self.proxy_url);

		match service_type {
			Some(service_type) => append_args(
				&hxri,
				&[("_xrd_r", "application/xrds+xml"), ("_xrd_t", service_type)],
			),
			None => append_args(&hxri, &[("_xrd_r", "application/xrds+xml;sep=false")]),
		}
	}

	/// Fetches and verifies the XRDS for `xri`.
	///
	/// Returns the verified CanonicalID (if any) together with every service of the final `XRD`.
	/// Fetch failures become [`DiscoveryFailure`]; a forged authority chain surfaces as
	/// [`crate::error::XrdsError::Fraud`].
	pub async fn query(
		&self,
		fetcher: &dyn Fetcher,
		xri: &str,
	) -> Result<(Option<String>, Vec<ServiceElement>)> {
		let url = self.query_url(xri, None);
		let response = fetcher
			.fetch(FetchRequest::get(&url))
			.await
			.map_err(|e| DiscoveryFailure::new(&url, format!("Could not fetch {xri}, {e}")))?;

		if !matches!(response.status, 200 | 206) {
			return Err(DiscoveryFailure::new(&url, format!("Could not fetch {xri}"))
				.with_status(response.status)
				.into());
		}

		let document = xrds::parse(&response.body)?;
		let canonical_id = document.canonical_id(xri)?;
		let services = document.services()?.to_vec();

		Ok((canonical_id, services))
	}
}
impl Default for ProxyResolver {
	fn default() -> Self {
		Self::new(DEFAULT_PROXY)
	}
}
