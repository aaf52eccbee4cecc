//! Crate-level error types shared across discovery, resolution, sessions, and realm checks.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Input is not a usable http/https URI.
	#[error(transparent)]
	MalformedUri(#[from] MalformedUri),
	/// XRDS document is unusable or asserts an authority it does not hold.
	#[error(transparent)]
	Xrds(#[from] XrdsError),
	/// Network or protocol-level discovery failure; callers may try another candidate.
	#[error(transparent)]
	Discovery(#[from] DiscoveryFailure),
	/// Realm discovery URL redirected elsewhere.
	#[error(transparent)]
	RealmVerificationRedirected(#[from] RealmVerificationRedirected),
	/// Transport failure (DNS, TCP, TLS, redirects).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Session-store failure.
	#[error("{0}")]
	Session(
		#[from]
		#[source]
		crate::session::SessionError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// A discovery cursor is still live for this URL.
	///
	/// This is a caller bug (the previous cursor must be exhausted or destroyed first) and is
	/// never produced by a well-formed call sequence.
	#[error("A discovery cursor for {yadis_url} already exists.")]
	CursorExists {
		/// Yadis URL the new cursor would have been created for.
		yadis_url: String,
	},
}

/// Raised when a URI cannot be normalized into an http/https form.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Malformed URI `{uri}`: {reason}.")]
pub struct MalformedUri {
	/// Offending input.
	pub uri: String,
	/// Short description of the failed rule.
	pub reason: &'static str,
}
impl MalformedUri {
	pub(crate) fn new(uri: impl Into<String>, reason: &'static str) -> Self {
		Self { uri: uri.into(), reason }
	}
}

/// Failures raised while reading an XRDS document.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum XrdsError {
	/// Text is not well-formed XML or its root is not `xrds:XRDS`.
	#[error("Not an XRDS document: {reason}.")]
	NotXrds {
		/// Parser or validation detail.
		reason: String,
	},
	/// Document contains no `XRD` element to read services from.
	#[error("No XRD element found.")]
	MissingXrd,
	/// CanonicalID chain or root authority does not hold.
	#[error("{claimed} can not come from {authority}.")]
	Fraud {
		/// Identifier asserted by the document.
		claimed: String,
		/// Authority that would have to have issued it.
		authority: String,
	},
	/// XRI resolution returned no CanonicalID.
	#[error("No CanonicalID found for XRI {iname}.")]
	MissingCanonicalId {
		/// XRI being resolved.
		iname: String,
	},
}
impl XrdsError {
	/// Returns true for the fraud variant, which must never be downgraded.
	pub fn is_fraud(&self) -> bool {
		matches!(self, Self::Fraud { .. })
	}
}

/// Discovery failed for a URL.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Discovery failed for {url}: {message}.")]
pub struct DiscoveryFailure {
	/// URL being discovered when the failure occurred.
	pub url: String,
	/// Underlying cause.
	pub message: String,
	/// HTTP status, when the failure came from a response.
	pub status: Option<u16>,
}
impl DiscoveryFailure {
	/// Builds a failure without an HTTP status.
	pub fn new(url: impl Into<String>, message: impl Display) -> Self {
		Self { url: url.into(), message: message.to_string(), status: None }
	}

	/// Attaches the HTTP status that caused the failure.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}
}

/// An endpoint filter rejected a service as malformed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct FilterError {
	/// Why the service could not become an endpoint.
	pub message: String,
}
impl FilterError {
	/// Builds a filter error from a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Realm verification fetched a URL that redirected.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Attempting to verify {relying_party_url} resulted in redirect to {rp_url_after_redirects}.")]
pub struct RealmVerificationRedirected {
	/// Discovery URL built from the realm.
	pub relying_party_url: String,
	/// URL the fetcher ended up at.
	pub rp_url_after_redirects: String,
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// XRI proxy URL cannot be parsed.
	#[error("XRI proxy URL is invalid.")]
	InvalidProxyUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// XRI proxy URL is not http/https.
	#[error("XRI proxy URL must use http or https: {url}.")]
	UnsupportedProxyScheme {
		/// Rejected URL.
		url: String,
	},
	/// Session key suffix is empty.
	#[error("Session key suffix cannot be empty.")]
	EmptySessionKeySuffix,
	/// Session key suffix contains whitespace.
	#[error("Session key suffix contains whitespace: {suffix}.")]
	InvalidSessionKeySuffix {
		/// Rejected suffix.
		suffix: String,
	},
	/// Redirect limit must allow at least one hop.
	#[error("Redirect limit must be greater than zero.")]
	ZeroRedirectLimit,
	/// Serialized configuration could not be parsed.
	#[error("Configuration could not be parsed.")]
	Parse {
		/// Structured parsing failure, with the path of the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, redirects).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while fetching {url}.")]
	Network {
		/// URL being fetched.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Redirect chain exceeded the configured limit.
	#[error("Too many redirects while fetching {url} (limit {limit}).")]
	TooManyRedirects {
		/// URL of the last hop.
		url: String,
		/// Configured limit.
		limit: u8,
	},
	/// Response body exceeded the size cap.
	#[error("Response from {url} is larger than {limit} bytes.")]
	ResponseTooLarge {
		/// URL being fetched.
		url: String,
		/// Cap in bytes.
		limit: usize,
	},
	/// Request or redirect target is not a valid URL.
	#[error("Cannot fetch invalid URL {url}.")]
	InvalidUrl {
		/// Offending URL.
		url: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while fetching.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}
