//! Optional observability helpers for discovery and realm verification.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `openid_discovery.flow` with the `flow` and
//!   `stage` fields, plus warning events for realm redirects, return_to mismatches, stopped HTML
//!   scans, and unreadable session values.
//! - Enable `metrics` to increment the `openid_discovery_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and to count discovered endpoints
//!   per [`EndpointSource`] (`openid_discovery_endpoints_total`, `openid_discovery_empty_total`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Discovery chains observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscoveryKind {
	/// Yadis discovery of a URL.
	Yadis,
	/// XRI proxy resolution.
	Xri,
	/// Realm return_to verification.
	RealmVerification,
}
impl DiscoveryKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DiscoveryKind::Yadis => "yadis",
			DiscoveryKind::Xri => "xri",
			DiscoveryKind::RealmVerification => "realm_verification",
		}
	}
}
impl Display for DiscoveryKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscoveryOutcome {
	/// Entry to a discovery chain.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl DiscoveryOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DiscoveryOutcome::Attempt => "attempt",
			DiscoveryOutcome::Success => "success",
			DiscoveryOutcome::Failure => "failure",
		}
	}
}
impl Display for DiscoveryOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Where identifier discovery found its endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointSource {
	/// OpenID services of an XRDS document.
	Yadis,
	/// `<link rel>` tags of the identifier page.
	Html,
	/// Services of a proxy-resolved XRI.
	Xri,
}
impl EndpointSource {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			EndpointSource::Yadis => "yadis",
			EndpointSource::Html => "html",
			EndpointSource::Xri => "xri",
		}
	}
}

/// Runs one discovery chain inside its span, recording attempt and outcome.
pub async fn observe<T, Fut>(kind: DiscoveryKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = DiscoverySpan::new(kind, stage);

	record_discovery_outcome(kind, DiscoveryOutcome::Attempt);

	let outcome = span.instrument(fut).await;

	record_discovery_outcome(
		kind,
		if outcome.is_ok() { DiscoveryOutcome::Success } else { DiscoveryOutcome::Failure },
	);

	outcome
}
