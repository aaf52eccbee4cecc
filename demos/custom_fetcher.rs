//! Demonstrates plugging a custom [`Fetcher`] into the consumer.
//!
//! 1. Implement [`Fetcher`] so every request resolves to a [`FetchResponse`] carrying the final
//!    URL after redirects.
//! 2. Report transport failures through [`TransportError`]; discovery turns them into
//!    discovery failures for the URL being fetched.
//! 3. Wrap the fetcher in `Arc` and pass it to [`Consumer::new`].

// std
use std::{
	collections::{BTreeMap, HashMap},
	io::{Error as IoError, ErrorKind},
	sync::Arc,
};
// crates.io
use color_eyre::Result;
// self
use openid_discovery::{
	config::DiscoveryConfig,
	consumer::Consumer,
	error::TransportError,
	http::{FetchFuture, FetchRequest, FetchResponse, Fetcher},
	session::MemorySession,
};

/// Serves pages from memory, the way an offline cache or a recorded fixture set would.
#[derive(Debug, Default)]
struct CannedFetcher {
	pages: HashMap<String, (String, String)>,
}
impl CannedFetcher {
	fn page(mut self, url: &str, content_type: &str, body: &str) -> Self {
		self.pages.insert(url.into(), (content_type.into(), body.into()));

		self
	}
}
impl Fetcher for CannedFetcher {
	fn fetch(&self, request: FetchRequest) -> FetchFuture<'_> {
		let result = match self.pages.get(&request.url) {
			Some((content_type, body)) => Ok(FetchResponse {
				status: 200,
				headers: BTreeMap::from([("content-type".to_owned(), content_type.clone())]),
				body: body.clone(),
				final_url: request.url,
			}),
			None => Err(TransportError::network(
				&request.url,
				IoError::new(ErrorKind::NotFound, "page is not cached"),
			)),
		};

		Box::pin(async move { result })
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let fetcher = CannedFetcher::default().page(
		"http://bob.example.com/",
		"text/html",
		r#"<html><head>
<link rel="openid.server" href="http://op.example.com/server">
<link rel="openid.delegate" href="http://bob.op.example.com/">
</head></html>"#,
	);
	let consumer =
		Consumer::new(Arc::new(fetcher), Arc::new(MemorySession::default()), DiscoveryConfig::default());
	let (claimed, endpoints) = consumer.discover("bob.example.com").await?;

	println!("Claimed identifier: {claimed}.");

	for endpoint in endpoints {
		println!(
			"Server {} with local id {}.",
			endpoint.server_url(),
			endpoint.local_id_or_claimed().unwrap_or("-")
		);
	}

	match consumer.discover("http://carol.example.com/").await {
		Ok((_, endpoints)) => println!("Unexpected endpoints: {endpoints:?}."),
		Err(e) => println!("Discovery failed as expected: {e}."),
	}

	Ok(())
}
