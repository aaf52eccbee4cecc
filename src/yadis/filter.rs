//! Endpoint filter pipeline turning XRDS services into typed endpoints.
//!
//! A [`Filter`] is either a transform (an ordered list of functions tried per service URI, first
//! hit wins) or a compound of sub-filters whose results are concatenated. Filters are assembled
//! from declarative [`FilterPart`] lists with [`Filter::from_parts`].

// self
use crate::{
	_prelude::*,
	error::{DiscoveryFailure, FilterError},
	yadis::xrds::{self, ServiceElement},
};

/// Function form of a filter: `Ok(None)` rejects the candidate.
pub type FilterFn<E> =
	Arc<dyn Fn(&BasicServiceEndpoint) -> Result<Option<E>, FilterError> + Send + Sync>;

/// Type usable as a filter by rebuilding itself from a raw service endpoint.
pub trait EndpointPrototype<E>
where
	Self: Send + Sync,
{
	/// Builds an endpoint from `endpoint`, or `Ok(None)` if it does not apply.
	fn from_basic_service_endpoint(
		&self,
		endpoint: &BasicServiceEndpoint,
	) -> Result<Option<E>, FilterError>;
}

/// One URI of one service, before any protocol-specific interpretation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicServiceEndpoint {
	/// URL the XRDS was discovered for.
	pub yadis_url: String,
	/// Service `Type` values.
	pub type_uris: Vec<String>,
	/// Service URI this endpoint stands for.
	pub uri: String,
	/// Service element the URI came from.
	pub service: ServiceElement,
}
impl BasicServiceEndpoint {
	/// Returns this endpoint's types that also appear in `type_uris`, in this endpoint's order.
	pub fn match_types(&self, type_uris: &[&str]) -> Vec<String> {
		self.type_uris.iter().filter(|t| type_uris.contains(&t.as_str())).cloned().collect()
	}
}
impl EndpointPrototype<BasicServiceEndpoint> for BasicServiceEndpoint {
	fn from_basic_service_endpoint(
		&self,
		endpoint: &BasicServiceEndpoint,
	) -> Result<Option<BasicServiceEndpoint>, FilterError> {
		Ok(Some(endpoint.clone()))
	}
}

/// Ordered list of filter functions applied per service URI.
pub struct TransformFilter<E> {
	procs: Vec<FilterFn<E>>,
}
impl<E> TransformFilter<E> {
	/// Builds a transform from `procs`.
	pub fn new(procs: Vec<FilterFn<E>>) -> Self {
		Self { procs }
	}

	/// Number of functions in this transform.
	pub fn len(&self) -> usize {
		self.procs.len()
	}

	/// True when the transform holds no functions.
	pub fn is_empty(&self) -> bool {
		self.procs.is_empty()
	}

	/// Runs the functions in order and returns the first accepted endpoint.
	pub fn apply_filters(&self, endpoint: &BasicServiceEndpoint) -> Result<Option<E>, FilterError> {
		for filter in &self.procs {
			if let Some(found) = filter(endpoint)? {
				return Ok(Some(found));
			}
		}

		Ok(None)
	}

	/// Produces at most one endpoint per URI of `service`, URIs in priority order.
	pub fn get_service_endpoints(
		&self,
		yadis_url: &str,
		service: &ServiceElement,
	) -> Result<Vec<E>, FilterError> {
		let mut endpoints = Vec::new();

		for uri in service.sorted_uris() {
			let basic = BasicServiceEndpoint {
				yadis_url: yadis_url.to_owned(),
				type_uris: service.types.clone(),
				uri: uri.uri.clone(),
				service: service.clone(),
			};

			if let Some(endpoint) = self.apply_filters(&basic)? {
				endpoints.push(endpoint);
			}
		}

		Ok(endpoints)
	}
}
impl<E> Clone for TransformFilter<E> {
	fn clone(&self) -> Self {
		Self { procs: self.procs.clone() }
	}
}
impl<E> Debug for TransformFilter<E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TransformFilter").field("procs", &self.procs.len()).finish()
	}
}

/// Closed set of filter shapes.
pub enum Filter<E> {
	/// Per-URI transform.
	Transform(TransformFilter<E>),
	/// Concatenation of sub-filter results.
	Compound(Vec<Filter<E>>),
}
impl<E> Filter<E>
where
	E: 'static,
{
	/// Builds a transform from a single function.
	pub fn from_fn<F>(f: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&BasicServiceEndpoint) -> Result<Option<E>, FilterError>,
	{
		let f: FilterFn<E> = Arc::new(f);

		Self::Transform(TransformFilter::new(vec![f]))
	}

	/// Builds a transform that asks `prototype` to rebuild each endpoint.
	pub fn from_prototype(prototype: Arc<dyn EndpointPrototype<E>>) -> Self {
		Self::Transform(TransformFilter::new(vec![prototype_fn(prototype)]))
	}

	/// Builds a filter from a declarative list.
	///
	/// Already-built filters and nested lists each become one sub-filter, in order. Functions and
	/// prototypes are gathered into a single trailing transform. A lone resulting sub-filter is
	/// returned as is; an empty list yields an empty compound.
	pub fn from_parts(parts: Vec<FilterPart<E>>) -> Self {
		let mut subfilters = Vec::new();
		let mut transformers = Vec::new();

		for part in parts {
			match part {
				FilterPart::Fn(f) => transformers.push(f),
				FilterPart::Prototype(prototype) => transformers.push(prototype_fn(prototype)),
				FilterPart::Filter(filter) => subfilters.push(filter),
				FilterPart::List(parts) => subfilters.push(Self::from_parts(parts)),
			}
		}

		if !transformers.is_empty() {
			subfilters.push(Self::Transform(TransformFilter::new(transformers)));
		}
		if subfilters.len() == 1 {
			return subfilters.remove(0);
		}

		Self::Compound(subfilters)
	}

	/// Produces all endpoints this filter derives from `service`.
	pub fn get_service_endpoints(
		&self,
		yadis_url: &str,
		service: &ServiceElement,
	) -> Result<Vec<E>, FilterError> {
		match self {
			Self::Transform(transform) => transform.get_service_endpoints(yadis_url, service),
			Self::Compound(subfilters) => {
				let mut endpoints = Vec::new();

				for filter in subfilters {
					endpoints.extend(filter.get_service_endpoints(yadis_url, service)?);
				}

				Ok(endpoints)
			},
		}
	}
}
impl Filter<BasicServiceEndpoint> {
	/// Identity filter yielding one [`BasicServiceEndpoint`] per service URI.
	pub fn basic() -> Self {
		Self::from_prototype(Arc::new(BasicServiceEndpoint::default()))
	}
}
impl<E> Clone for Filter<E> {
	fn clone(&self) -> Self {
		match self {
			Self::Transform(transform) => Self::Transform(transform.clone()),
			Self::Compound(subfilters) => Self::Compound(subfilters.clone()),
		}
	}
}
impl<E> Debug for Filter<E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Transform(transform) => f.debug_tuple("Transform").field(transform).finish(),
			Self::Compound(subfilters) => f.debug_tuple("Compound").field(subfilters).finish(),
		}
	}
}

/// Declarative input to [`Filter::from_parts`].
pub enum FilterPart<E> {
	/// Filter function.
	Fn(FilterFn<E>),
	/// Endpoint prototype.
	Prototype(Arc<dyn EndpointPrototype<E>>),
	/// Already-built filter.
	Filter(Filter<E>),
	/// Nested list, built recursively.
	List(Vec<FilterPart<E>>),
}

/// Parses `xrds_text` and runs every service of its last `XRD` through `filter`.
///
/// Services are visited in ascending `priority` (missing sorts as 0, ties in document order).
/// Filter failures are reported as [`DiscoveryFailure`] for `yadis_url`.
pub fn apply_filter<E>(yadis_url: &str, xrds_text: &str, filter: &Filter<E>) -> Result<Vec<E>>
where
	E: 'static,
{
	let document = xrds::parse(xrds_text)?;
	let mut services = document.services()?.iter().collect::<Vec<_>>();
	let mut endpoints = Vec::new();

	services.sort_by_key(|service| service.priority.unwrap_or(0));

	for service in services {
		endpoints.extend(
			filter
				.get_service_endpoints(yadis_url, service)
				.map_err(|e| DiscoveryFailure::new(yadis_url, e))?,
		);
	}

	Ok(endpoints)
}

fn prototype_fn<E>(prototype: Arc<dyn EndpointPrototype<E>>) -> FilterFn<E>
where
	E: 'static,
{
	Arc::new(move |endpoint: &BasicServiceEndpoint| prototype.from_basic_service_endpoint(endpoint))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::yadis::xrds::ServiceUri;

	fn service(types: &[&str], uris: &[(Option<i64>, &str)]) -> ServiceElement {
		ServiceElement {
			types: types.iter().map(|t| t.to_string()).collect(),
			uris: uris
				.iter()
				.map(|(priority, uri)| ServiceUri { priority: *priority, uri: uri.to_string() })
				.collect(),
			..Default::default()
		}
	}

	fn constant(value: &'static str) -> FilterPart<String> {
		FilterPart::Fn(Arc::new(move |_: &BasicServiceEndpoint| Ok(Some(value.to_owned()))))
	}

	#[test]
	fn match_types_keeps_endpoint_order() {
		let endpoint = BasicServiceEndpoint {
			type_uris: vec!["urn:bogus".into(), "urn:testing".into()],
			..Default::default()
		};

		assert!(endpoint.match_types(&[]).is_empty());
		assert!(endpoint.match_types(&["urn:absent"]).is_empty());
		assert_eq!(endpoint.match_types(&["urn:testing", "urn:bogus"]), ["urn:bogus", "urn:testing"]);
		assert_eq!(endpoint.match_types(&["urn:bogus", "urn:absent"]), ["urn:bogus"]);
		assert!(BasicServiceEndpoint::default().match_types(&["urn:bogus"]).is_empty());
	}

	#[test]
	fn transform_tries_functions_in_order() {
		let odd: FilterFn<&'static str> =
			Arc::new(|e: &BasicServiceEndpoint| Ok(e.uri.ends_with('1').then_some("odd")));
		let even: FilterFn<&'static str> =
			Arc::new(|e: &BasicServiceEndpoint| Ok(e.uri.ends_with('2').then_some("even")));
		let transform = TransformFilter::new(vec![odd, even]);
		let mut endpoint = BasicServiceEndpoint { uri: "http://x/1".into(), ..Default::default() };

		assert_eq!(transform.apply_filters(&endpoint), Ok(Some("odd")));

		endpoint.uri = "http://x/2".into();

		assert_eq!(transform.apply_filters(&endpoint), Ok(Some("even")));

		endpoint.uri = "http://x/3".into();

		assert_eq!(transform.apply_filters(&endpoint), Ok(None));
		assert_eq!(TransformFilter::<String>::new(Vec::new()).apply_filters(&endpoint), Ok(None));
	}

	#[test]
	fn transform_yields_one_endpoint_per_uri_in_priority_order() {
		let element = service(
			&["urn:type1", "urn:type2"],
			&[(Some(5), "http://late/"), (None, "http://first/"), (Some(1), "http://second/")],
		);
		let endpoints = Filter::basic()
			.get_service_endpoints("http://yad.is/", &element)
			.expect("Identity filter cannot fail.");
		let uris = endpoints.iter().map(|e| e.uri.as_str()).collect::<Vec<_>>();

		assert_eq!(uris, ["http://first/", "http://second/", "http://late/"]);
		assert!(endpoints.iter().all(|e| e.yadis_url == "http://yad.is/" && e.service == element));
		assert!(
			Filter::basic()
				.get_service_endpoints("http://yad.is/", &service(&["urn:x"], &[]))
				.expect("Identity filter cannot fail.")
				.is_empty()
		);
	}

	#[test]
	fn compound_concatenates_sub_filters() {
		let compound = Filter::Compound(vec![
			Filter::from_parts(vec![constant("bogus")]),
			Filter::from_parts(vec![constant("third")]),
		]);
		let element = service(&[], &[(None, "http://a/")]);

		assert_eq!(
			compound.get_service_endpoints("unused", &element),
			Ok(vec!["bogus".to_owned(), "third".to_owned()])
		);
	}

	#[test]
	fn from_parts_follows_grouping_rules() {
		assert!(matches!(Filter::<String>::from_parts(Vec::new()), Filter::Compound(ref v) if v.is_empty()));
		assert!(matches!(
			Filter::<String>::from_parts(vec![FilterPart::Filter(Filter::Transform(TransformFilter::new(
				Vec::new()
			)))]),
			Filter::Transform(ref t) if t.is_empty()
		));
		assert!(matches!(
			Filter::from_parts(vec![constant("a"), constant("b")]),
			Filter::Transform(ref t) if t.len() == 2
		));

		let built = Filter::from_parts(vec![
			FilterPart::Filter(Filter::Transform(TransformFilter::new(Vec::new()))),
			constant("first"),
			FilterPart::List(vec![constant("nested")]),
			constant("fn"),
		]);
		let Filter::Compound(subfilters) = &built else {
			panic!("Mixed parts must build a compound filter.");
		};

		assert_eq!(subfilters.len(), 3);
		assert!(matches!(&subfilters[0], Filter::Transform(t) if t.is_empty()));
		assert!(matches!(&subfilters[1], Filter::Transform(t) if t.len() == 1));
		assert!(matches!(&subfilters[2], Filter::Transform(t) if t.len() == 2));

		let element = service(&[], &[(None, "http://a/")]);

		assert_eq!(
			built.get_service_endpoints("unused", &element),
			Ok(vec!["nested".to_owned(), "first".to_owned()])
		);
	}

	#[test]
	fn apply_filter_wraps_filter_errors() {
		let text = r#"<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)"><XRD>
<Service priority="2"><URI>http://two/</URI></Service>
<Service priority="1"><URI>http://one/</URI></Service>
</XRD></xrds:XRDS>"#;
		let endpoints = apply_filter("http://y/", text, &Filter::basic()).expect("Fixture should parse.");

		assert_eq!(endpoints.iter().map(|e| e.uri.as_str()).collect::<Vec<_>>(), ["http://one/", "http://two/"]);

		let failing = Filter::<String>::from_fn(|_| Err(FilterError::new("conflicting local ids")));
		let err = apply_filter("http://y/", text, &failing).expect_err("Filter error must surface.");

		assert!(matches!(err, Error::Discovery(ref failure) if failure.url == "http://y/"));
		assert!(matches!(
			apply_filter("http://y/", "<html/>", &Filter::basic()),
			Err(Error::Xrds(crate::error::XrdsError::NotXrds { .. }))
		));
	}
}
