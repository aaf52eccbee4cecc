//! Demonstrates walking the endpoints of an identifier with the default reqwest fetcher and an
//! in-memory session.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use openid_discovery::{
	config::DiscoveryConfig,
	consumer::Consumer,
	endpoint::{Endpoint, OPENID_1_1_TYPE, OPENID_2_0_TYPE},
	session::{MemorySession, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let xrds = format!(
		r#"<?xml version="1.0" encoding="UTF-8"?>
<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)">
  <XRD>
    <Service priority="20"><Type>{OPENID_1_1_TYPE}</Type><URI>{legacy}</URI></Service>
    <Service priority="10"><Type>{OPENID_2_0_TYPE}</Type><URI>{current}</URI></Service>
  </XRD>
</xrds:XRDS>"#,
		legacy = server.url("/op/legacy"),
		current = server.url("/op/server"),
	);
	let identity_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/alice");
			then.status(200)
				.header("content-type", "text/html")
				.header("x-xrds-location", server.url("/alice/xrds"))
				.body("<html><head></head><body>alice</body></html>");
		})
		.await;
	let xrds_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/alice/xrds");
			then.status(200).header("content-type", "application/xrds+xml").body(&xrds);
		})
		.await;
	let session = MemorySession::default();
	let consumer = Consumer::with_reqwest(Arc::new(session.clone()), DiscoveryConfig::default())?;
	let identifier = server.url("/alice");

	while let Some(endpoint) = consumer.next_endpoint(&identifier).await? {
		println!(
			"Trying {} (claimed {}, compatibility mode {}).",
			endpoint.server_url(),
			endpoint.claimed_identifier().unwrap_or("-"),
			endpoint.compatibility_mode()
		);

		if endpoint.compatibility_mode() {
			break;
		}
	}

	println!("Cursor stored: {}.", session.get("DiscoveredServices::auth").await?.is_some());

	let abandoned = consumer.cleanup(&identifier, false).await?;

	println!("Cleaned up at {:?}; session empty: {}.", abandoned.as_ref().map(Endpoint::server_url), session.is_empty());

	identity_mock.assert_async().await;
	xrds_mock.assert_async().await;

	Ok(())
}
