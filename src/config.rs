//! Discovery configuration with validated construction.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::DEFAULT_REDIRECT_LIMIT,
	yadis::xrires::{DEFAULT_PROXY, ProxyResolver},
};

/// Session key suffix used when none is configured.
pub const DEFAULT_SESSION_KEY_SUFFIX: &str = "auth";

/// Settings shared by every discovery entry point of a [`crate::consumer::Consumer`].
///
/// Deserializing runs the same validation as [`DiscoveryConfigBuilder::build`]; missing fields
/// take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDiscoveryConfig")]
pub struct DiscoveryConfig {
	/// XRI proxy resolver base URL, always ending in `/`.
	pub xri_proxy_url: String,
	/// Suffix of the session key holding the discovery cursor.
	pub session_key_suffix: String,
	/// Redirect hops allowed per fetch.
	pub redirect_limit: u8,
}
impl DiscoveryConfig {
	/// Starts a builder seeded with the defaults.
	pub fn builder() -> DiscoveryConfigBuilder {
		DiscoveryConfigBuilder::default()
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| ConfigError::Parse { source })
	}

	/// XRI resolver targeting the configured proxy.
	pub fn proxy_resolver(&self) -> ProxyResolver {
		ProxyResolver::new(self.xri_proxy_url.as_str())
	}
}
impl Default for DiscoveryConfig {
	fn default() -> Self {
		Self {
			xri_proxy_url: DEFAULT_PROXY.into(),
			session_key_suffix: DEFAULT_SESSION_KEY_SUFFIX.into(),
			redirect_limit: DEFAULT_REDIRECT_LIMIT,
		}
	}
}
impl TryFrom<RawDiscoveryConfig> for DiscoveryConfig {
	type Error = ConfigError;

	fn try_from(raw: RawDiscoveryConfig) -> Result<Self, Self::Error> {
		DiscoveryConfigBuilder {
			xri_proxy_url: raw.xri_proxy_url,
			session_key_suffix: raw.session_key_suffix,
			redirect_limit: raw.redirect_limit,
		}
		.build()
	}
}

/// Builder for [`DiscoveryConfig`] values.
#[derive(Clone, Debug)]
pub struct DiscoveryConfigBuilder {
	/// XRI proxy resolver base URL.
	pub xri_proxy_url: String,
	/// Session key suffix.
	pub session_key_suffix: String,
	/// Redirect hops allowed per fetch.
	pub redirect_limit: u8,
}
impl DiscoveryConfigBuilder {
	/// Overrides the XRI proxy URL.
	pub fn xri_proxy_url(mut self, url: impl Into<String>) -> Self {
		self.xri_proxy_url = url.into();

		self
	}

	/// Overrides the session key suffix.
	pub fn session_key_suffix(mut self, suffix: impl Into<String>) -> Self {
		self.session_key_suffix = suffix.into();

		self
	}

	/// Overrides the redirect limit.
	pub fn redirect_limit(mut self, limit: u8) -> Self {
		self.redirect_limit = limit;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<DiscoveryConfig, ConfigError> {
		let proxy = Url::parse(&self.xri_proxy_url)
			.map_err(|source| ConfigError::InvalidProxyUrl { source })?;

		if !matches!(proxy.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedProxyScheme { url: self.xri_proxy_url });
		}

		validate_session_key_suffix(&self.session_key_suffix)?;

		if self.redirect_limit == 0 {
			return Err(ConfigError::ZeroRedirectLimit);
		}

		Ok(DiscoveryConfig {
			xri_proxy_url: ProxyResolver::new(self.xri_proxy_url).proxy_url().to_owned(),
			session_key_suffix: self.session_key_suffix,
			redirect_limit: self.redirect_limit,
		})
	}
}
impl Default for DiscoveryConfigBuilder {
	fn default() -> Self {
		let DiscoveryConfig { xri_proxy_url, session_key_suffix, redirect_limit } =
			DiscoveryConfig::default();

		Self { xri_proxy_url, session_key_suffix, redirect_limit }
	}
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawDiscoveryConfig {
	xri_proxy_url: String,
	session_key_suffix: String,
	redirect_limit: u8,
}
impl Default for RawDiscoveryConfig {
	fn default() -> Self {
		let DiscoveryConfig { xri_proxy_url, session_key_suffix, redirect_limit } =
			DiscoveryConfig::default();

		Self { xri_proxy_url, session_key_suffix, redirect_limit }
	}
}

fn validate_session_key_suffix(suffix: &str) -> Result<(), ConfigError> {
	if suffix.is_empty() {
		Err(ConfigError::EmptySessionKeySuffix)
	} else if suffix.chars().any(char::is_whitespace) {
		Err(ConfigError::InvalidSessionKeySuffix { suffix: suffix.to_owned() })
	} else {
		Ok(())
	}
}
