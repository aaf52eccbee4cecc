//! Realm (trust root) parsing, sanity checks, URL matching, and return_to verification.
//!
//! A realm is a URL pattern a relying party sends with authentication requests. It may start
//! with a `*.` wildcard covering the host and its subdomains. Return_to verification discovers
//! the realm's own XRDS and checks the return_to URL against the return_to patterns it declares.

pub mod tld;

// self
use crate::{
	_prelude::*,
	error::{FilterError, RealmVerificationRedirected},
	http::Fetcher,
	obs::{self, DiscoveryKind},
	urinorm,
	yadis::{BasicServiceEndpoint, Filter, get_service_endpoints},
};

/// Service type of relying-party return_to endpoints.
pub const RP_RETURN_TO_URL_TYPE: &str = "http://specs.openid.net/auth/2.0/return_to";

/// A parsed realm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustRoot {
	unparsed: String,
	protocol: String,
	wildcard: bool,
	host: String,
	port: u16,
	path: String,
}
impl TrustRoot {
	/// Parses `trust_root`, or `None` when it is not a usable http/https realm.
	///
	/// `scheme://*/` is a wildcard over every host. Otherwise the URL must normalize, its host
	/// must not start with `.`, and it must not carry a fragment.
	pub fn parse(trust_root: &str) -> Option<Self> {
		let wildcard = trust_root.contains("://*.");
		let stripped =
			if wildcard { trust_root.replacen("*.", "", 1) } else { trust_root.to_owned() };

		if !wildcard && matches!(stripped.as_str(), "http://*/" | "https://*/") {
			let protocol = stripped.split(':').next().unwrap_or_default().to_owned();
			let port = if protocol == "http" { 80 } else { 443 };

			return Some(Self {
				unparsed: trust_root.to_owned(),
				protocol,
				wildcard: true,
				host: String::new(),
				port,
				path: "/".into(),
			});
		}

		let (protocol, host, port, path) = parse_url(&stripped)?;

		if host.starts_with('.') || path.contains('#') {
			return None;
		}
		if !matches!(protocol.as_str(), "http" | "https") {
			return None;
		}

		Some(Self { unparsed: trust_root.to_owned(), protocol, wildcard, host, port, path })
	}

	/// Parses `trust_root` and reports whether it is sane; unparsable realms are not.
	pub fn check_sanity(trust_root: &str) -> bool {
		Self::parse(trust_root).is_some_and(|trust_root| trust_root.is_sane())
	}

	/// Parses `trust_root` and reports whether `url` falls under it.
	pub fn check_url(trust_root: &str, url: &str) -> bool {
		Self::parse(trust_root).is_some_and(|trust_root| trust_root.validate_url(url))
	}

	/// Realm exactly as given.
	pub fn unparsed(&self) -> &str {
		&self.unparsed
	}

	/// `http` or `https`.
	pub fn protocol(&self) -> &str {
		&self.protocol
	}

	/// True for `*.` realms.
	pub fn is_wildcard(&self) -> bool {
		self.wildcard
	}

	/// Host with the wildcard label removed; empty for `scheme://*/`.
	pub fn host(&self) -> &str {
		&self.host
	}

	/// Port, defaulted from the scheme.
	pub fn port(&self) -> u16 {
		self.port
	}

	/// Path including any query.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Whether the realm is narrow enough to be trusted.
	///
	/// `localhost` and the bare `scheme://*/` pattern are sane. Other hosts need at least two
	/// non-empty labels ending in a known top-level domain, with no wildcard in the last two
	/// labels. A wildcard over a two-letter top-level domain whose second label has at most three
	/// characters (`*.co.uk`) needs a third label.
	pub fn is_sane(&self) -> bool {
		if self.host.is_empty() {
			return self.wildcard;
		}
		if self.host == "localhost" {
			return true;
		}

		let mut labels = self.host.split('.').collect::<Vec<_>>();

		while labels.last() == Some(&"") {
			labels.pop();
		}

		if labels[labels.len().saturating_sub(2)..].iter().any(|label| label.contains('*')) {
			return false;
		}
		if labels.is_empty() || labels.contains(&"") {
			return false;
		}

		let tld = labels[labels.len() - 1];

		if !tld::is_top_level_domain(tld) || labels.len() == 1 {
			return false;
		}
		if self.wildcard && tld.len() == 2 && labels[labels.len() - 2].len() <= 3 {
			return labels.len() > 2;
		}

		true
	}

	/// URL relying-party discovery runs against: the realm itself, or `www.` in place of the
	/// wildcard.
	pub fn build_discovery_url(&self) -> String {
		if !self.wildcard {
			return self.unparsed.clone();
		}

		let port = if self.port == default_port(&self.protocol) {
			String::new()
		} else {
			format!(":{}", self.port)
		};

		format!("{}://www.{}{port}{}", self.protocol, self.host, self.path)
	}

	/// Whether `url` falls under this realm.
	///
	/// Scheme and port must match exactly. The host must equal the realm host, or for wildcard
	/// realms be a subdomain of it. The realm path must prefix the URL path at a boundary: `&`
	/// when the realm path has a query, `/` or `?` otherwise.
	pub fn validate_url(&self, url: &str) -> bool {
		let Some((protocol, host, port, path)) = parse_url(url) else { return false };

		if protocol != self.protocol || port != self.port || host.contains('*') {
			return false;
		}

		let host_matches = if self.wildcard {
			self.host.is_empty() || host == self.host || host.ends_with(&format!(".{}", self.host))
		} else {
			host == self.host
		};

		if !host_matches {
			return false;
		}
		if path == self.path {
			return true;
		}
		if !path.starts_with(&self.path) {
			return false;
		}

		let allowed = if self.path.contains('?') { "&" } else { "?/" };

		self.path.chars().last().is_some_and(|c| allowed.contains(c))
			|| path[self.path.len()..].chars().next().is_some_and(|c| allowed.contains(c))
	}
}

/// Filter function keeping the URI of return_to services.
pub fn extract_return_url(endpoint: &BasicServiceEndpoint) -> Result<Option<String>, FilterError> {
	if endpoint.match_types(&[RP_RETURN_TO_URL_TYPE]).is_empty() {
		Ok(None)
	} else {
		Ok(Some(endpoint.uri.clone()))
	}
}

/// True when some non-wildcard pattern in `allowed_return_to_urls` admits `return_to`.
pub fn return_to_matches(allowed_return_to_urls: &[String], return_to: &str) -> bool {
	allowed_return_to_urls.iter().any(|allowed| {
		TrustRoot::parse(allowed)
			.is_some_and(|pattern| !pattern.is_wildcard() && pattern.validate_url(return_to))
	})
}

/// Discovers the return_to URLs declared at `relying_party_url`.
///
/// Fails with [`RealmVerificationRedirected`] when discovery ended at another URL.
pub async fn get_allowed_return_urls(
	fetcher: &dyn Fetcher,
	relying_party_url: &str,
) -> Result<Vec<String>> {
	let filter = Filter::from_fn(extract_return_url);
	let (rp_url_after_redirects, return_to_urls) =
		get_service_endpoints(fetcher, relying_party_url, &filter).await?;

	if rp_url_after_redirects != relying_party_url {
		return Err(RealmVerificationRedirected {
			relying_party_url: relying_party_url.to_owned(),
			rp_url_after_redirects,
		}
		.into());
	}

	Ok(return_to_urls)
}

/// Checks that `return_to` is one of the URLs `realm` declares through relying-party discovery.
///
/// Unparsable realms, redirected discovery, and unmatched URLs are `Ok(false)`; discovery
/// failures are errors.
pub async fn verify_return_to(fetcher: &dyn Fetcher, realm: &str, return_to: &str) -> Result<bool> {
	let Some(trust_root) = TrustRoot::parse(realm) else { return Ok(false) };

	obs::observe(
		DiscoveryKind::RealmVerification,
		"verify_return_to",
		verify_against(fetcher, trust_root, return_to),
	)
	.await
}

async fn verify_against(
	fetcher: &dyn Fetcher,
	trust_root: TrustRoot,
	return_to: &str,
) -> Result<bool> {
	let allowed = match get_allowed_return_urls(fetcher, &trust_root.build_discovery_url()).await {
		Ok(allowed) => allowed,
		Err(Error::RealmVerificationRedirected(e)) => {
			obs::log_realm_redirected(&e.relying_party_url, &e.rp_url_after_redirects);

			return Ok(false);
		},
		Err(e) => return Err(e),
	};

	if return_to_matches(&allowed, return_to) {
		return Ok(true);
	}

	obs::log_return_to_mismatch(return_to, &allowed);

	Ok(false)
}

fn parse_url(url: &str) -> Option<(String, String, u16, String)> {
	let parts = urinorm::normalize_parts(url).ok()?;
	let port = parts.effective_port();
	let mut path = parts.path;

	if let Some(query) = parts.query.filter(|query| !query.is_empty()) {
		path.push('?');
		path.push_str(&query);
	}
	if let Some(fragment) = parts.fragment.filter(|fragment| !fragment.is_empty()) {
		path.push('#');
		path.push_str(&fragment);
	}

	Some((parts.scheme, parts.host, port, path))
}

fn default_port(protocol: &str) -> u16 {
	if protocol == "https" { 443 } else { 80 }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{StubFetcher, mk_service, mk_xrds};

	#[test]
	fn parse_rejects_bad_realms() {
		assert!(TrustRoot::parse("http://example.com/").is_some());
		assert!(TrustRoot::parse("ftp://example.com/").is_none());
		assert!(TrustRoot::parse("http://example.com/#frag").is_none());
		assert!(TrustRoot::parse("http://.example.com/").is_none());
		assert!(TrustRoot::parse("not a realm").is_none());

		let wildcard = TrustRoot::parse("https://*.example.com:8443/path").expect("Realm should parse.");

		assert!(wildcard.is_wildcard());
		assert_eq!(wildcard.host(), "example.com");
		assert_eq!(wildcard.port(), 8443);
		assert_eq!(wildcard.path(), "/path");
	}

	#[test]
	fn sanity_rules() {
		for sane in [
			"http://*.example.com/",
			"http://example.com/",
			"http://localhost:8000/",
			"http://*.example.co.uk/",
			"http://*/",
			"https://www.example.museum/",
		] {
			assert!(TrustRoot::check_sanity(sane), "{sane} should be sane.");
		}
		for insane in [
			"http://*.co.uk/",
			"http://*.com/",
			"http://com/",
			"http://example.invalidtld/",
			"http://example..com/",
			"http://*.x.*.com/",
			"ftp://example.com/",
		] {
			assert!(!TrustRoot::check_sanity(insane), "{insane} should not be sane.");
		}

		let any = TrustRoot::parse("http://*/").expect("Realm should parse.");

		assert!(any.is_sane());
		assert_eq!(any.host(), "");
		assert!(any.validate_url("http://anything.example.org/"));
	}

	#[test]
	fn wildcard_matching() {
		let realm = TrustRoot::parse("http://*.example.com/").expect("Realm should parse.");

		assert!(realm.validate_url("http://foo.example.com/"));
		assert!(realm.validate_url("http://example.com/deep/path"));
		assert!(!realm.validate_url("http://evil.com/"));
		assert!(!realm.validate_url("http://fooexample.com/"));
		assert!(!realm.validate_url("https://foo.example.com/"));
		assert!(!realm.validate_url("http://foo.example.com:8080/"));
	}

	#[test]
	fn path_boundaries() {
		assert!(TrustRoot::check_url("http://example.com/foo", "http://example.com/foo/bar"));
		assert!(TrustRoot::check_url("http://example.com/foo", "http://example.com/foo?x=1"));
		assert!(!TrustRoot::check_url("http://example.com/foo", "http://example.com/foobar"));
		assert!(TrustRoot::check_url("http://example.com/foo/", "http://example.com/foo/bar"));
		assert!(TrustRoot::check_url("http://example.com/?a=1", "http://example.com/?a=1&b=2"));
		assert!(!TrustRoot::check_url("http://example.com/?a=1", "http://example.com/?a=12"));
		assert!(!TrustRoot::check_url("http://example.com/foo", "http://example.com/"));
	}

	#[test]
	fn discovery_url_replaces_wildcard() {
		let realm = TrustRoot::parse("http://*.example.com:8080/rp").expect("Realm should parse.");

		assert_eq!(realm.build_discovery_url(), "http://www.example.com:8080/rp");
		assert_eq!(
			TrustRoot::parse("https://*.example.com/")
				.expect("Realm should parse.")
				.build_discovery_url(),
			"https://www.example.com/"
		);
		assert_eq!(
			TrustRoot::parse("http://example.com/rp")
				.expect("Realm should parse.")
				.build_discovery_url(),
			"http://example.com/rp"
		);
	}

	#[test]
	fn return_to_patterns_must_not_be_wildcards() {
		let allowed = vec!["http://*.example.com/".to_owned(), "http://rp.example.com/return".to_owned()];

		assert!(return_to_matches(&allowed, "http://rp.example.com/return?nonce=1"));
		assert!(!return_to_matches(&allowed, "http://other.example.com/"));
	}

	#[tokio::test]
	async fn verify_return_to_uses_declared_urls() {
		let xrds = mk_xrds(&[mk_service(&[RP_RETURN_TO_URL_TYPE], &["http://www.example.com/return"])]);
		let fetcher = StubFetcher::default().respond(
			"http://www.example.com/",
			200,
			Some("application/xrds+xml"),
			&xrds,
		);

		assert!(
			verify_return_to(&fetcher, "http://*.example.com/", "http://www.example.com/return")
				.await
				.expect("Verification should complete.")
		);
		assert!(
			!verify_return_to(&fetcher, "http://*.example.com/", "http://www.example.com/elsewhere")
				.await
				.expect("Verification should complete.")
		);
		assert!(
			!verify_return_to(&fetcher, "not a realm", "http://www.example.com/return")
				.await
				.expect("Unparsable realms are a plain mismatch.")
		);
	}

	#[tokio::test]
	async fn redirected_realm_discovery_fails_closed() {
		let xrds = mk_xrds(&[mk_service(&[RP_RETURN_TO_URL_TYPE], &["http://www.example.com/return"])]);
		let fetcher = StubFetcher::default()
			.redirect("http://www.example.com/", "http://evil.example.net/")
			.respond("http://evil.example.net/", 200, Some("application/xrds+xml"), &xrds);

		assert!(matches!(
			get_allowed_return_urls(&fetcher, "http://www.example.com/").await,
			Err(Error::RealmVerificationRedirected(_))
		));
		assert!(
			!verify_return_to(&fetcher, "http://*.example.com/", "http://www.example.com/return")
				.await
				.expect("A redirect is a mismatch, not an error.")
		);
	}
}
