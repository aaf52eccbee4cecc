//! Relying-party facade tying discovery, the endpoint cursor, and realm verification to one
//! fetcher, session store, and configuration.

pub mod discovery;
pub mod manager;

pub use discovery::{
	arrange_by_type, discover, discover_uri, discover_xri, get_op_or_user_services, normalize_url,
};
pub use manager::{DiscoveredServices, DiscoveryManager, SessionValue};

// self
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestFetcher};
use crate::{
	_prelude::*,
	config::DiscoveryConfig,
	endpoint::Endpoint,
	http::Fetcher,
	session::SessionStore,
	trustroot,
	yadis::ProxyResolver,
};

/// Entry point for relying parties.
///
/// Every call goes through the fetcher and session store given at construction; nothing is
/// process-wide.
#[derive(Clone)]
pub struct Consumer {
	fetcher: Arc<dyn Fetcher>,
	session: Arc<dyn SessionStore>,
	config: DiscoveryConfig,
	resolver: ProxyResolver,
}
impl Consumer {
	/// Creates a consumer from explicit collaborators.
	pub fn new(
		fetcher: Arc<dyn Fetcher>,
		session: Arc<dyn SessionStore>,
		config: DiscoveryConfig,
	) -> Self {
		let resolver = config.proxy_resolver();

		Self { fetcher, session, config, resolver }
	}

	/// Creates a consumer backed by [`ReqwestFetcher`] honoring the configured redirect limit.
	#[cfg(feature = "reqwest")]
	pub fn with_reqwest(
		session: Arc<dyn SessionStore>,
		config: DiscoveryConfig,
	) -> Result<Self, ConfigError> {
		let fetcher = ReqwestFetcher::new(config.redirect_limit)?;

		Ok(Self::new(Arc::new(fetcher), session, config))
	}

	/// Active configuration.
	pub fn config(&self) -> &DiscoveryConfig {
		&self.config
	}

	/// Fetcher used for every discovery.
	pub fn fetcher(&self) -> &dyn Fetcher {
		self.fetcher.as_ref()
	}

	/// Runs discovery for `identifier` without touching the session.
	pub async fn discover(&self, identifier: &str) -> Result<(String, Vec<Endpoint>)> {
		discovery::discover(self.fetcher.as_ref(), &self.resolver, identifier).await
	}

	/// Cursor manager for `identifier` under the configured session key.
	pub fn manager(&self, identifier: &str) -> DiscoveryManager<Endpoint> {
		DiscoveryManager::new(self.session.clone(), identifier, &self.config.session_key_suffix)
	}

	/// Next endpoint to try for `identifier`, discovering only when no cursor is usable.
	pub async fn next_endpoint(&self, identifier: &str) -> Result<Option<Endpoint>> {
		self.manager(identifier)
			.get_next_service(|url| async move { self.discover(&url).await })
			.await
	}

	/// Endpoint being tried for `identifier`; the cursor is destroyed.
	pub async fn cleanup(&self, identifier: &str, force: bool) -> Result<Option<Endpoint>> {
		self.manager(identifier).cleanup(force).await
	}

	/// Checks `return_to` against the URLs `realm` declares.
	pub async fn verify_return_to(&self, realm: &str, return_to: &str) -> Result<bool> {
		trustroot::verify_return_to(self.fetcher.as_ref(), realm, return_to).await
	}
}
impl Debug for Consumer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Consumer")
			.field("config", &self.config)
			.field("resolver", &self.resolver)
			.finish_non_exhaustive()
	}
}
