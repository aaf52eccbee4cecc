// self
use crate::obs::{DiscoveryKind, DiscoveryOutcome, EndpointSource};

/// Counter of discovery chain attempts and their outcomes, labeled by `flow` and `outcome`.
pub const DISCOVERY_FLOW_COUNTER: &str = "openid_discovery_flow_total";
/// Counter of endpoints handed back by identifier discovery, labeled by `source`.
pub const DISCOVERED_ENDPOINTS_COUNTER: &str = "openid_discovery_endpoints_total";
/// Counter of identifier discoveries that found no endpoint, labeled by `source`.
pub const EMPTY_DISCOVERY_COUNTER: &str = "openid_discovery_empty_total";

/// Records a discovery outcome via the global metrics recorder (when enabled).
pub fn record_discovery_outcome(kind: DiscoveryKind, outcome: DiscoveryOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(DISCOVERY_FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records how many endpoints one identifier discovery produced from `source`.
///
/// An empty result bumps [`EMPTY_DISCOVERY_COUNTER`] instead, so a provider that stops
/// publishing XRDS shows up as a rising HTML or empty share rather than as a failure.
pub fn record_endpoints_found(source: EndpointSource, count: usize) {
	#[cfg(feature = "metrics")]
	{
		if count == 0 {
			metrics::counter!(EMPTY_DISCOVERY_COUNTER, "source" => source.as_str()).increment(1);
		} else {
			metrics::counter!(DISCOVERED_ENDPOINTS_COUNTER, "source" => source.as_str())
				.increment(count as u64);
		}
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (source, count);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_noops_without_a_global_recorder() {
		record_discovery_outcome(DiscoveryKind::Xri, DiscoveryOutcome::Failure);
		record_endpoints_found(EndpointSource::Html, 0);
		record_endpoints_found(EndpointSource::Yadis, 2);
	}

	#[test]
	fn counter_names_are_namespaced() {
		for name in [DISCOVERY_FLOW_COUNTER, DISCOVERED_ENDPOINTS_COUNTER, EMPTY_DISCOVERY_COUNTER] {
			assert!(name.starts_with("openid_discovery_") && name.ends_with("_total"));
		}
	}
}
