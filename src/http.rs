//! Fetch primitives consumed by discovery and realm verification.
//!
//! Discovery only needs a handful of response fields (status, `content-type`,
//! `x-xrds-location`, body, and the URL reached after redirects), so the transport contract is
//! a single [`Fetcher::fetch`] call. Implementations follow redirects themselves and report the
//! final URL exactly; realm verification relies on it to detect redirected discovery URLs.

// crates.io
#[cfg(feature = "reqwest")]
use reqwest::{
	Method, Response, StatusCode,
	header::{CONTENT_TYPE, LOCATION, USER_AGENT as USER_AGENT_HEADER},
	redirect::Policy,
};
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Redirect hops followed when a request does not set its own limit.
pub const DEFAULT_REDIRECT_LIMIT: u8 = 5;
/// Largest response body accepted by the built-in fetcher.
pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;
/// `User-Agent` sent when the caller does not supply one.
pub const USER_AGENT: &str = concat!("openid-discovery/", env!("CARGO_PKG_VERSION"));

/// Boxed future returned by [`Fetcher::fetch`].
pub type FetchFuture<'a> =
	Pin<Box<dyn Future<Output = Result<FetchResponse, TransportError>> + 'a + Send>>;

/// HTTP transport used for every discovery fetch.
///
/// A request with a body is a POST; otherwise a GET. Redirects are followed up to
/// [`FetchRequest::redirect_limit`] (or the implementation's default) and
/// [`FetchResponse::final_url`] names the URL that produced the returned response.
pub trait Fetcher
where
	Self: Send + Sync,
{
	/// Performs `request`, following redirects.
	fn fetch(&self, request: FetchRequest) -> FetchFuture<'_>;
}
impl<F> Fetcher for Arc<F>
where
	F: ?Sized + Fetcher,
{
	fn fetch(&self, request: FetchRequest) -> FetchFuture<'_> {
		(**self).fetch(request)
	}
}

/// Outbound request description.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchRequest {
	/// Absolute URL to fetch.
	pub url: String,
	/// Form body; turns the request into a POST.
	pub body: Option<String>,
	/// Extra request headers.
	pub headers: BTreeMap<String, String>,
	/// Redirect hops allowed for this request.
	pub redirect_limit: Option<u8>,
}
impl FetchRequest {
	/// Builds a GET request for `url`.
	pub fn get(url: impl Into<String>) -> Self {
		Self { url: url.into(), ..Default::default() }
	}

	/// Attaches a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Attaches a form body.
	pub fn with_body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Overrides the redirect limit.
	pub fn with_redirect_limit(mut self, limit: u8) -> Self {
		self.redirect_limit = Some(limit);

		self
	}
}

/// Response after redirects were followed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchResponse {
	/// Status code of the final response.
	pub status: u16,
	/// Headers keyed by lower-cased name.
	pub headers: BTreeMap<String, String>,
	/// Decoded body text.
	pub body: String,
	/// URL that produced this response.
	pub final_url: String,
}
impl FetchResponse {
	/// Looks up a header case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// `content-type` without parameters, lower-cased.
	pub fn media_type(&self) -> Option<String> {
		self.header("content-type")
			.and_then(|value| value.split(';').next())
			.map(|value| value.trim().to_ascii_lowercase())
	}
}

/// [`Fetcher`] backed by [`ReqwestClient`].
///
/// Redirects are followed by hand so the final URL is known exactly and the hop limit is
/// enforced per request. A client passed to [`ReqwestFetcher::with_client`] must have redirect
/// following disabled.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestFetcher {
	client: ReqwestClient,
	redirect_limit: u8,
	max_response_bytes: usize,
}
#[cfg(feature = "reqwest")]
impl ReqwestFetcher {
	/// Builds a fetcher with its own client.
	pub fn new(redirect_limit: u8) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Ok(Self::with_client(client, redirect_limit))
	}

	/// Wraps an existing client that does not follow redirects.
	pub fn with_client(client: ReqwestClient, redirect_limit: u8) -> Self {
		Self { client, redirect_limit, max_response_bytes: MAX_RESPONSE_BYTES }
	}

	/// Overrides the body size cap, [`MAX_RESPONSE_BYTES`] by default.
	pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
		self.max_response_bytes = limit;

		self
	}

	async fn execute(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
		let limit = request.redirect_limit.unwrap_or(self.redirect_limit);
		let mut current = Url::parse(&request.url)
			.map_err(|_| TransportError::InvalidUrl { url: request.url.clone() })?;
		let mut current_str = request.url.clone();
		let mut body = request.body.clone();
		let mut hops = 0_u8;

		loop {
			let method = if body.is_some() { Method::POST } else { Method::GET };
			let mut builder = self
				.client
				.request(method, current.clone())
				.header(USER_AGENT_HEADER, USER_AGENT);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &body {
				if !request.headers.keys().any(|name| name.eq_ignore_ascii_case("content-type")) {
					builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
				}

				builder = builder.body(body.clone());
			}

			let response =
				builder.send().await.map_err(|e| TransportError::network(&current_str, e))?;
			let status = response.status();

			let location = status.is_redirection().then(|| response.headers().get(LOCATION)).flatten();

			if let Some(location) = location {
				if hops >= limit {
					return Err(TransportError::TooManyRedirects { url: current_str, limit });
				}

				let next = location
					.to_str()
					.ok()
					.and_then(|location| current.join(location).ok())
					.ok_or_else(|| TransportError::InvalidUrl { url: current_str.clone() })?;

				if matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER)
				{
					body = None;
				}

				current_str = next.to_string();
				current = next;
				hops += 1;

				continue;
			}

			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.fold(BTreeMap::<String, String>::new(), |mut headers, (name, value)| {
					headers
						.entry(name)
						.and_modify(|existing| {
							existing.push_str(", ");
							existing.push_str(&value);
						})
						.or_insert(value);

					headers
				});
			let text = read_capped(response, &current_str, self.max_response_bytes).await?;

			return Ok(FetchResponse { status: status.as_u16(), headers, body: text, final_url: current_str });
		}
	}
}
#[cfg(feature = "reqwest")]
impl Fetcher for ReqwestFetcher {
	fn fetch(&self, request: FetchRequest) -> FetchFuture<'_> {
		Box::pin(self.execute(request))
	}
}

/// Reads the body chunk by chunk, failing as soon as it would exceed `limit` bytes.
///
/// A declared `content-length` over the limit is rejected before any chunk is read. Bodies are
/// decoded as UTF-8 with invalid sequences replaced.
#[cfg(feature = "reqwest")]
async fn read_capped(
	mut response: Response,
	url: &str,
	limit: usize,
) -> Result<String, TransportError> {
	let too_large = || TransportError::ResponseTooLarge { url: url.to_owned(), limit };

	if response.content_length().is_some_and(|length| length > limit as u64) {
		return Err(too_large());
	}

	let mut body = Vec::new();

	while let Some(chunk) = response.chunk().await.map_err(|e| TransportError::network(url, e))? {
		if body.len() + chunk.len() > limit {
			return Err(too_large());
		}

		body.extend_from_slice(&chunk);
	}

	Ok(String::from_utf8_lossy(&body).into_owned())
}
