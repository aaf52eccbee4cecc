//! Demonstrates checking a return_to URL against the URLs a realm publishes through relying-party
//! discovery.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use openid_discovery::{
	config::DiscoveryConfig,
	consumer::Consumer,
	session::MemorySession,
	trustroot::{RP_RETURN_TO_URL_TYPE, TrustRoot},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let realm = server.url("/");
	let return_to = server.url("/return");
	let xrds = format!(
		r#"<?xml version="1.0" encoding="UTF-8"?>
<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)">
  <XRD>
    <Service><Type>{RP_RETURN_TO_URL_TYPE}</Type><URI>{return_to}</URI></Service>
  </XRD>
</xrds:XRDS>"#
	);
	let realm_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/");
			then.status(200).header("content-type", "application/xrds+xml").body(&xrds);
		})
		.await;
	let consumer =
		Consumer::with_reqwest(Arc::new(MemorySession::default()), DiscoveryConfig::default())?;

	for candidate in ["http://*.example.com/", "http://*.co.uk/", "http://localhost:8080/"] {
		println!("Realm {candidate} sane: {}.", TrustRoot::check_sanity(candidate));
	}
	for candidate in [return_to.clone(), format!("{return_to}/callback"), server.url("/elsewhere")] {
		let verified = consumer.verify_return_to(&realm, &candidate).await?;

		println!("{candidate} verified: {verified}.");
	}

	realm_mock.assert_hits_async(3).await;

	Ok(())
}
