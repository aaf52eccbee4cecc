//! Yadis discovery orchestrator.
//!
//! One discovery is a chain of at most two fetches: the identifier URL itself, then the XRDS
//! location it advertises (via `X-XRDS-Location` or an HTML `<meta>` tag) when the first response
//! was not already an XRDS document.

// self
use crate::{
	_prelude::*,
	error::DiscoveryFailure,
	http::{FetchRequest, FetchResponse, Fetcher},
	obs::{self, DiscoveryKind},
	yadis::{
		accept::{Preference, generate_accept_header},
		filter::{Filter, apply_filter},
		location::find_html_yadis_location,
	},
};

/// Media type of XRDS documents.
pub const YADIS_CONTENT_TYPE: &str = "application/xrds+xml";
/// Response header naming the XRDS location.
pub const YADIS_HEADER_NAME: &str = "X-XRDS-Location";

const HTML_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// Outcome of the fetch phase of Yadis discovery.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
	/// URL discovery started from.
	pub request_url: String,
	/// URL reached after redirects of the first fetch.
	pub normalized_url: String,
	/// URL the XRDS document was read from, when one was found.
	pub xrds_url: Option<String>,
	/// `content-type` of the response whose body is kept.
	pub content_type: Option<String>,
	/// Body of the XRDS document, or of the first response when none was found.
	pub response_text: String,
}
impl DiscoveryResult {
	/// True when the XRDS came from a second fetch.
	pub fn used_yadis_location(&self) -> bool {
		self.xrds_url.as_ref().is_some_and(|xrds_url| *xrds_url != self.normalized_url)
	}

	/// True when [`DiscoveryResult::response_text`] is an XRDS document.
	pub fn is_xrds(&self) -> bool {
		self.used_yadis_location() || self.content_type.as_deref().is_some_and(is_xrds_content_type)
	}
}

/// Runs the fetch phase of Yadis discovery on `url`.
pub async fn discover(fetcher: &dyn Fetcher, url: &str) -> Result<DiscoveryResult, DiscoveryFailure> {
	let accept = generate_accept_header([
		Preference::from(("text/html", 0.3)),
		Preference::from(("application/xhtml+xml", 0.5)),
		Preference::from(YADIS_CONTENT_TYPE),
	])
	.map_err(|e| DiscoveryFailure::new(url, e))?;
	let response = fetcher
		.fetch(FetchRequest::get(url).with_header("Accept", accept))
		.await
		.map_err(|e| DiscoveryFailure::new(url, e))?;

	check_status(url, &response)?;

	let mut result = DiscoveryResult {
		request_url: url.to_owned(),
		normalized_url: response.final_url.clone(),
		content_type: response.header("content-type").map(ToOwned::to_owned),
		..Default::default()
	};

	if result.content_type.as_deref().is_some_and(is_xrds_content_type) {
		result.xrds_url = Some(result.normalized_url.clone());
		result.response_text = response.body;

		return Ok(result);
	}

	let Some(location) = whereis_yadis(&response) else {
		result.response_text = response.body;

		return Ok(result);
	};
	let xrds_response = fetcher
		.fetch(FetchRequest::get(&location))
		.await
		.map_err(|e| DiscoveryFailure::new(&location, e))?;

	check_status(&location, &xrds_response)?;

	let content_type = xrds_response.header("content-type").map(ToOwned::to_owned);

	if !content_type.as_deref().is_some_and(is_xrds_content_type) {
		return Err(DiscoveryFailure::new(
			&xrds_response.final_url,
			format!(
				"XRDS location did not return an XRDS document (content-type {})",
				content_type.as_deref().unwrap_or("missing")
			),
		));
	}

	result.xrds_url = Some(xrds_response.final_url);
	result.content_type = content_type;
	result.response_text = xrds_response.body;

	Ok(result)
}

/// Performs Yadis discovery on `url` and runs the XRDS through `filter`.
///
/// Returns the URL reached after redirects together with the filtered endpoints; a URL without
/// an XRDS document yields no endpoints. Fetch, document, and filter failures are reported as
/// [`DiscoveryFailure`].
pub async fn get_service_endpoints<E>(
	fetcher: &dyn Fetcher,
	url: &str,
	filter: &Filter<E>,
) -> Result<(String, Vec<E>)>
where
	E: 'static,
{
	obs::observe(
		DiscoveryKind::Yadis,
		"get_service_endpoints",
		filter_discovered(fetcher, url, filter),
	)
	.await
}

async fn filter_discovered<E>(
	fetcher: &dyn Fetcher,
	url: &str,
	filter: &Filter<E>,
) -> Result<(String, Vec<E>)>
where
	E: 'static,
{
	let result = discover(fetcher, url).await?;

	if !result.is_xrds() {
		return Ok((result.normalized_url, Vec::new()));
	}

	let endpoints =
		apply_filter(&result.normalized_url, &result.response_text, filter).map_err(|e| match e {
			Error::Xrds(e) => DiscoveryFailure::new(&result.normalized_url, e).into(),
			e => e,
		})?;

	Ok((result.normalized_url, endpoints))
}

/// True for `application/xrds+xml`, parameters and case ignored.
pub fn is_xrds_content_type(content_type: &str) -> bool {
	media_type(content_type) == YADIS_CONTENT_TYPE
}

/// Finds where the XRDS for `response` lives, if it advertises one.
pub fn whereis_yadis(response: &FetchResponse) -> Option<String> {
	if let Some(location) = response.header(YADIS_HEADER_NAME) {
		return Some(location.trim().to_owned());
	}

	let is_html = match response.header("content-type") {
		Some(content_type) => HTML_CONTENT_TYPES.contains(&media_type(content_type).as_str()),
		None => true,
	};

	if is_html { find_html_yadis_location(&response.body) } else { None }
}

fn media_type(content_type: &str) -> String {
	content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

fn check_status(url: &str, response: &FetchResponse) -> Result<(), DiscoveryFailure> {
	if matches!(response.status, 200 | 206) {
		return Ok(());
	}

	Err(DiscoveryFailure::new(
		url,
		format!("HTTP response status was {}, expected 200 or 206", response.status),
	)
	.with_status(response.status))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{StubFetcher, mk_xrds, mk_service};

	const HTML_WITH_LOCATION: &str = r#"<html><head>
<meta http-equiv="X-XRDS-Location" content="http://example.com/xrds">
</head><body></body></html>"#;

	#[tokio::test]
	async fn xrds_response_is_used_directly() {
		let xrds = mk_xrds(&[mk_service(&["urn:x"], &["http://op/"])]);
		let fetcher = StubFetcher::default()
			.redirect("http://id.example/", "http://id.example/final")
			.respond("http://id.example/final", 200, Some("application/xrds+xml; charset=UTF-8"), &xrds);
		let result = discover(&fetcher, "http://id.example/").await.expect("Discovery should succeed.");

		assert_eq!(result.normalized_url, "http://id.example/final");
		assert_eq!(result.xrds_url.as_deref(), Some("http://id.example/final"));
		assert!(result.is_xrds());
		assert!(!result.used_yadis_location());

		let requests = fetcher.requests();
		let request = &requests[0];

		assert_eq!(
			request.headers.get("Accept").map(String::as_str),
			Some("text/html; q=0.3, application/xhtml+xml; q=0.5, application/xrds+xml")
		);
	}

	#[tokio::test]
	async fn html_meta_location_is_followed() {
		let xrds = mk_xrds(&[mk_service(&["urn:x"], &["http://op/"])]);
		let fetcher = StubFetcher::default()
			.respond("http://id.example/", 200, Some("text/html"), HTML_WITH_LOCATION)
			.respond("http://example.com/xrds", 200, Some("application/xrds+xml"), &xrds);
		let result = discover(&fetcher, "http://id.example/").await.expect("Discovery should succeed.");

		assert!(result.used_yadis_location());
		assert_eq!(result.normalized_url, "http://id.example/");
		assert_eq!(result.xrds_url.as_deref(), Some("http://example.com/xrds"));
		assert_eq!(result.response_text, xrds);
	}

	#[tokio::test]
	async fn header_location_wins_over_html() {
		let xrds = mk_xrds(&[]);
		let fetcher = StubFetcher::default()
			.respond_with_headers(
				"http://id.example/",
				200,
				&[("Content-Type", "text/plain"), ("X-XRDS-Location", "http://hdr.example/xrds")],
				"",
			)
			.respond("http://hdr.example/xrds", 200, Some("application/xrds+xml"), &xrds);
		let result = discover(&fetcher, "http://id.example/").await.expect("Discovery should succeed.");

		assert_eq!(result.xrds_url.as_deref(), Some("http://hdr.example/xrds"));
	}

	#[tokio::test]
	async fn wrong_status_or_type_fails() {
		let fetcher = StubFetcher::default().respond("http://id.example/", 404, Some("text/html"), "");
		let failure = discover(&fetcher, "http://id.example/").await.expect_err("404 must fail.");

		assert_eq!(failure.status, Some(404));
		assert_eq!(failure.url, "http://id.example/");

		let fetcher = StubFetcher::default()
			.respond("http://id.example/", 200, Some("text/html"), HTML_WITH_LOCATION)
			.respond("http://example.com/xrds", 200, Some("text/plain"), "nope");
		let failure = discover(&fetcher, "http://id.example/").await.expect_err("Non-XRDS must fail.");

		assert_eq!(failure.url, "http://example.com/xrds");

		let fetcher = StubFetcher::default();

		assert!(discover(&fetcher, "http://unreachable/").await.is_err());
	}

	#[tokio::test]
	async fn endpoints_are_filtered_and_missing_xrds_is_empty() {
		let xrds = mk_xrds(&[mk_service(&["urn:x"], &["http://op/", "http://op2/"])]);
		let fetcher = StubFetcher::default()
			.respond("http://id.example/", 200, Some("application/xrds+xml"), &xrds)
			.respond("http://plain.example/", 200, Some("text/html"), "<html><head></head></html>")
			.respond("http://broken.example/", 200, Some("application/xrds+xml"), "<notxrds/>");
		let (url, endpoints) = get_service_endpoints(&fetcher, "http://id.example/", &Filter::basic())
			.await
			.expect("Discovery should succeed.");

		assert_eq!(url, "http://id.example/");
		assert_eq!(endpoints.len(), 2);

		let (_, endpoints) = get_service_endpoints(&fetcher, "http://plain.example/", &Filter::basic())
			.await
			.expect("Discovery without XRDS should succeed.");

		assert!(endpoints.is_empty());

		let err = get_service_endpoints(&fetcher, "http://broken.example/", &Filter::basic())
			.await
			.expect_err("A broken document must fail.");

		assert!(matches!(err, Error::Discovery(ref failure) if failure.url == "http://broken.example/"));
	}
}
