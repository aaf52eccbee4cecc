// self
use crate::{_prelude::*, obs::DiscoveryKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedDiscovery<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedDiscovery<F> = F;

/// A span wrapping one discovery chain.
#[derive(Clone, Debug)]
pub struct DiscoverySpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl DiscoverySpan {
	/// Creates a new span tagged with the provided discovery kind + stage.
	pub fn new(kind: DiscoveryKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("openid_discovery.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedDiscovery<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Realm discovery landed on a different URL than requested.
pub fn log_realm_redirected(relying_party_url: &str, final_url: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		relying_party_url,
		final_url,
		"Realm discovery redirected; refusing to verify return_to."
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (relying_party_url, final_url);
}

/// No discovered return_to pattern admits the candidate URL.
pub fn log_return_to_mismatch(return_to: &str, allowed: &[String]) {
	#[cfg(feature = "tracing")]
	tracing::warn!(return_to, ?allowed, "Return_to URL does not match any realm-declared URL.");
	#[cfg(not(feature = "tracing"))]
	let _ = (return_to, allowed);
}

/// HTML scanning hit malformed markup and stopped early.
pub fn log_html_scan_stopped(purpose: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(purpose, "HTML scan stopped at malformed markup.");
	#[cfg(not(feature = "tracing"))]
	let _ = purpose;
}

/// A persisted session value could not be decoded and was discarded.
pub fn log_session_value_discarded(key: &str, reason: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(key, %reason, "Discarding unreadable discovery session value.");
	#[cfg(not(feature = "tracing"))]
	let _ = (key, reason);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = DiscoverySpan::new(DiscoveryKind::Yadis, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn event_helpers_accept_inputs() {
		log_realm_redirected("http://www.example.com/", "http://evil.example.com/");
		log_return_to_mismatch("http://x/", &["http://y/".to_owned()]);
		log_html_scan_stopped("yadis");
		log_session_value_discarded("DiscoveredServices::auth", &"bad tag");
	}
}
