//! OpenID relying-party discovery core: Yadis/XRDS service discovery, XRI proxy resolution,
//! session-persisted endpoint cursors, and realm return_to verification behind one injectable
//! fetcher.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod consumer;
pub mod endpoint;
pub mod error;
pub mod html;
pub mod http;
pub mod obs;
pub mod session;
pub mod trustroot;
pub mod urinorm;
pub mod yadis;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports, a scripted fetcher, and XRDS fixture builders shared by unit and
	//! integration tests; enabled via `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::io::{Error as IoError, ErrorKind};
	// crates.io
	use parking_lot::Mutex;
	// self
	#[cfg(feature = "reqwest")] use crate::http::ReqwestFetcher;
	use crate::{
		error::TransportError,
		http::{DEFAULT_REDIRECT_LIMIT, FetchFuture, FetchRequest, FetchResponse, Fetcher},
		yadis::xrds::{OPENID_1_0_NS, XRD_NS_2_0, XRDS_NS},
	};

	#[derive(Clone, Debug)]
	enum StubRoute {
		Respond { status: u16, headers: BTreeMap<String, String>, body: String },
		Redirect(String),
		Fail,
	}

	/// [`Fetcher`] answering from a fixed routing table and recording every request.
	///
	/// Unknown URLs fail with a transport error, the same as an unreachable host.
	#[derive(Clone, Debug, Default)]
	pub struct StubFetcher {
		routes: HashMap<String, StubRoute>,
		requests: Arc<Mutex<Vec<FetchRequest>>>,
	}
	impl StubFetcher {
		/// Answers `url` with `status`, an optional `content-type`, and `body`.
		pub fn respond(self, url: &str, status: u16, content_type: Option<&str>, body: &str) -> Self {
			let headers = content_type.map(|value| vec![("Content-Type", value)]).unwrap_or_default();

			self.respond_with_headers(url, status, &headers, body)
		}

		/// Answers `url` with `status`, arbitrary headers, and `body`.
		pub fn respond_with_headers(
			mut self,
			url: &str,
			status: u16,
			headers: &[(&str, &str)],
			body: &str,
		) -> Self {
			let headers = headers
				.iter()
				.map(|(name, value)| (name.to_ascii_lowercase(), (*value).to_owned()))
				.collect();

			self.routes
				.insert(url.to_owned(), StubRoute::Respond { status, headers, body: body.to_owned() });

			self
		}

		/// Redirects `from` to `to`; chains are followed.
		pub fn redirect(mut self, from: &str, to: &str) -> Self {
			self.routes.insert(from.to_owned(), StubRoute::Redirect(to.to_owned()));

			self
		}

		/// Fails every fetch of `url` with a connection error.
		pub fn fail(mut self, url: &str) -> Self {
			self.routes.insert(url.to_owned(), StubRoute::Fail);

			self
		}

		/// Requests seen so far, in order.
		pub fn requests(&self) -> Vec<FetchRequest> {
			self.requests.lock().clone()
		}

		/// Number of requests seen for `url`.
		pub fn hits(&self, url: &str) -> usize {
			self.requests.lock().iter().filter(|request| request.url == url).count()
		}

		fn resolve(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
			let limit = request.redirect_limit.unwrap_or(DEFAULT_REDIRECT_LIMIT);
			let mut url = request.url.clone();
			let mut hops = 0_u8;

			self.requests.lock().push(request);

			loop {
				match self.routes.get(&url) {
					Some(StubRoute::Respond { status, headers, body }) =>
						return Ok(FetchResponse {
							status: *status,
							headers: headers.clone(),
							body: body.clone(),
							final_url: url,
						}),
					Some(StubRoute::Redirect(next)) => {
						if hops >= limit {
							return Err(TransportError::TooManyRedirects { url, limit });
						}

						url = next.clone();
						hops += 1;
					},
					Some(StubRoute::Fail) =>
						return Err(TransportError::network(
							&url,
							IoError::new(ErrorKind::ConnectionRefused, "stubbed connection failure"),
						)),
					None =>
						return Err(TransportError::Io(IoError::new(
							ErrorKind::NotFound,
							format!("no stubbed response for {url}"),
						))),
				}
			}
		}
	}
	impl Fetcher for StubFetcher {
		fn fetch(&self, request: FetchRequest) -> FetchFuture<'_> {
			let result = self.resolve(request);

			Box::pin(async move { result })
		}
	}

	/// Wraps service fragments into an XRDS document with a single `XRD`.
	pub fn mk_xrds(services: &[String]) -> String {
		format!(
			r#"<?xml version="1.0" encoding="UTF-8"?>
<xrds:XRDS xmlns:xrds="{XRDS_NS}" xmlns="{XRD_NS_2_0}" xmlns:openid="{OPENID_1_0_NS}">
<XRD>
{}
</XRD>
</xrds:XRDS>"#,
			services.concat()
		)
	}

	/// Builds one `Service` fragment with the given types and URIs.
	pub fn mk_service(types: &[&str], uris: &[&str]) -> String {
		let mut service = String::from("<Service>");

		for type_uri in types {
			service.push_str(&format!("<Type>{type_uri}</Type>"));
		}
		for uri in uris {
			service.push_str(&format!("<URI>{uri}</URI>"));
		}

		service.push_str("</Service>\n");

		service
	}

	/// Builds a reqwest fetcher that accepts the self-signed certificates produced by `httpmock`
	/// during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_fetcher(redirect_limit: u8) -> ReqwestFetcher {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestFetcher::with_client(client, redirect_limit)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
