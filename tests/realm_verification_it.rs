// self
use openid_discovery::{
	_preludet::*,
	trustroot::{RP_RETURN_TO_URL_TYPE, TrustRoot, get_allowed_return_urls, verify_return_to},
};

fn realm_fetcher(discovery_url: &str, return_tos: &[&str]) -> StubFetcher {
	StubFetcher::default().respond(
		discovery_url,
		200,
		Some("application/xrds+xml"),
		&mk_xrds(&[
			mk_service(&["urn:unrelated"], &["http://ignored.example.com/"]),
			mk_service(&[RP_RETURN_TO_URL_TYPE], return_tos),
		]),
	)
}

#[test]
fn documented_realm_examples() {
	let wildcard = TrustRoot::parse("http://*.example.com/").expect("Realm should parse.");

	assert!(wildcard.is_sane());
	assert!(wildcard.validate_url("http://foo.example.com/"));
	assert!(!wildcard.validate_url("http://evil.com/"));
	assert!(!TrustRoot::parse("http://*.co.uk/").expect("Realm should parse.").is_sane());

	let everything = TrustRoot::parse("http://*/").expect("Realm should parse.");

	assert!(everything.is_sane());
	assert_eq!(everything.host(), "");
}

#[tokio::test]
async fn declared_return_urls_are_collected() {
	let fetcher = realm_fetcher(
		"http://www.example.com/",
		&["http://www.example.com/return", "http://www.example.com/alt"],
	);
	let urls = get_allowed_return_urls(&fetcher, "http://www.example.com/")
		.await
		.expect("Realm discovery should succeed.");

	assert_eq!(urls, ["http://www.example.com/return", "http://www.example.com/alt"]);
}

#[tokio::test]
async fn return_to_verification_outcomes() {
	let fetcher = realm_fetcher("http://www.example.com/", &["http://www.example.com/return"]);

	assert!(
		verify_return_to(&fetcher, "http://*.example.com/", "http://www.example.com/return/x")
			.await
			.expect("Verification should complete.")
	);
	assert!(
		!verify_return_to(&fetcher, "http://*.example.com/", "http://www.example.com/returned")
			.await
			.expect("Verification should complete.")
	);
}

#[tokio::test]
async fn redirected_discovery_is_not_an_exception() {
	let fetcher = realm_fetcher("http://www.example.net/", &["http://www.example.com/return"])
		.redirect("http://www.example.com/", "http://www.example.net/");

	assert!(
		!verify_return_to(&fetcher, "http://*.example.com/", "http://www.example.com/return")
			.await
			.expect("A redirect should resolve to false.")
	);
}

#[tokio::test]
async fn discovery_failures_surface_as_errors() {
	let fetcher = StubFetcher::default().fail("http://www.example.com/");
	let err = verify_return_to(&fetcher, "http://*.example.com/", "http://www.example.com/return")
		.await
		.expect_err("A failed fetch is a discovery failure.");

	assert!(matches!(err, Error::Discovery(ref failure) if failure.url == "http://www.example.com/"));
}
