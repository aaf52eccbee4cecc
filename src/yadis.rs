//! Yadis service discovery: content negotiation, XRDS documents, XRI resolution, and the
//! endpoint filter pipeline.

pub mod accept;
pub mod discover;
pub mod filter;
pub mod location;
pub mod xrds;
pub mod xri;
pub mod xrires;

pub use discover::{DiscoveryResult, discover, get_service_endpoints};
pub use filter::{BasicServiceEndpoint, EndpointPrototype, Filter, FilterFn, FilterPart};
pub use xrds::{ServiceElement, XrdsDocument};
pub use xrires::ProxyResolver;
