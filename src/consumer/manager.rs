//! Session-persisted cursor over discovered endpoints.
//!
//! A relying party tries the endpoints discovered for one identifier in order, across several
//! HTTP requests. The cursor ([`DiscoveredServices`]) lives in the session between requests and
//! is written back after every change, so an interrupted request never skips or repeats an
//! endpoint.

// std
use std::marker::PhantomData;
// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	obs,
	session::{SessionError, SessionStore},
};

/// Prefix of the session key holding the cursor.
pub const SESSION_KEY_PREFIX: &str = "DiscoveredServices::";

/// Ordered endpoints left to try for one identifier.
///
/// `current` is either unset or the endpoint most recently handed out by [`Iterator::next`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredServices<E> {
	/// URL the caller started discovery from.
	pub starting_url: String,
	/// URL discovery actually resolved to.
	pub yadis_url: String,
	services: VecDeque<E>,
	current: Option<E>,
}
impl<E> DiscoveredServices<E> {
	/// Creates a cursor that has not handed out anything yet.
	pub fn new(
		starting_url: impl Into<String>,
		yadis_url: impl Into<String>,
		services: impl IntoIterator<Item = E>,
	) -> Self {
		Self {
			starting_url: starting_url.into(),
			yadis_url: yadis_url.into(),
			services: services.into_iter().collect(),
			current: None,
		}
	}

	/// Endpoint handed out last.
	pub fn current(&self) -> Option<&E> {
		self.current.as_ref()
	}

	/// True when the cursor was built for `url`, either as starting or resolved URL.
	pub fn for_url(&self, url: &str) -> bool {
		self.starting_url == url || self.yadis_url == url
	}

	/// True once an endpoint is being tried.
	pub fn is_started(&self) -> bool {
		self.current.is_some()
	}

	/// True when no untried endpoint remains; `current` does not count.
	pub fn is_empty(&self) -> bool {
		self.services.is_empty()
	}

	/// Untried endpoints.
	pub fn remaining(&self) -> usize {
		self.services.len()
	}
}
impl<E> Iterator for DiscoveredServices<E>
where
	E: Clone,
{
	type Item = E;

	fn next(&mut self) -> Option<E> {
		self.current = self.services.pop_front();

		self.current.clone()
	}
}

/// Tagged session codec: every stored value says what it is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SessionValue<E> {
	/// A single endpoint.
	Endpoint(E),
	/// A plain string.
	Raw(String),
	/// A discovery cursor.
	Cursor(DiscoveredServices<E>),
}
impl<E> SessionValue<E>
where
	E: Serialize + DeserializeOwned,
{
	/// Encodes into the session representation.
	pub fn encode(&self) -> Result<Value, SessionError> {
		Ok(serde_json::to_value(self)?)
	}

	/// Decodes from the session representation; errors name the offending field.
	pub fn decode(value: Value) -> Result<Self, SessionError> {
		serde_path_to_error::deserialize(value).map_err(|e| SessionError::Serialization {
			message: format!("{} at `{}`", e.inner(), e.path()),
		})
	}
}

/// Drives discovery for one URL and hands out its endpoints one at a time.
pub struct DiscoveryManager<E> {
	session: Arc<dyn SessionStore>,
	url: String,
	session_key: String,
	_endpoint: PhantomData<fn() -> E>,
}
impl<E> DiscoveryManager<E>
where
	E: Clone + Send + Sync + Serialize + DeserializeOwned,
{
	/// Creates a manager for `url` storing its cursor under [`SESSION_KEY_PREFIX`] + `suffix`.
	pub fn new(session: Arc<dyn SessionStore>, url: impl Into<String>, suffix: &str) -> Self {
		Self {
			session,
			url: url.into(),
			session_key: format!("{SESSION_KEY_PREFIX}{suffix}"),
			_endpoint: PhantomData,
		}
	}

	/// URL this manager discovers for.
	pub fn url(&self) -> &str {
		&self.url
	}

	/// Session key of the persisted cursor.
	pub fn session_key(&self) -> &str {
		&self.session_key
	}

	/// Returns the next endpoint to try, running `discover` when no usable cursor exists.
	///
	/// An exhausted cursor is destroyed first. `discover` receives the manager URL and returns
	/// the resolved URL together with its endpoints; an empty list stores nothing and yields
	/// `None`.
	pub async fn get_next_service<F, Fut>(&self, discover: F) -> Result<Option<E>>
	where
		F: FnOnce(String) -> Fut,
		Fut: Future<Output = Result<(String, Vec<E>)>>,
	{
		let mut manager = self.get_manager(false).await?;

		if manager.as_ref().is_some_and(DiscoveredServices::is_empty) {
			self.destroy_manager(false).await?;

			manager = None;
		}
		if manager.is_none() {
			let (yadis_url, services) = discover(self.url.clone()).await?;

			manager = self.create_manager(yadis_url, services).await?;
		}

		let Some(mut manager) = manager else { return Ok(None) };
		let service = manager.next();

		self.store(&manager).await?;

		Ok(service)
	}

	/// Returns the endpoint being tried and destroys the cursor.
	///
	/// Without `force`, a cursor built for another URL is left alone and `None` is returned.
	pub async fn cleanup(&self, force: bool) -> Result<Option<E>> {
		let Some(manager) = self.get_manager(force).await? else { return Ok(None) };

		self.session.delete(&self.session_key).await?;

		Ok(manager.current)
	}

	/// Loads the cursor; without `force` only a cursor built for this URL is returned.
	pub async fn get_manager(&self, force: bool) -> Result<Option<DiscoveredServices<E>>> {
		let manager = self.load().await?;

		Ok(manager.filter(|manager| force || manager.for_url(&self.url)))
	}

	/// Stores a fresh cursor over `services`; an empty list stores nothing.
	///
	/// Fails with [`Error::CursorExists`] while a cursor for this URL is still stored.
	pub async fn create_manager(
		&self,
		yadis_url: String,
		services: Vec<E>,
	) -> Result<Option<DiscoveredServices<E>>> {
		if self.get_manager(false).await?.is_some() {
			return Err(Error::CursorExists { yadis_url });
		}
		if services.is_empty() {
			return Ok(None);
		}

		let manager = DiscoveredServices::new(self.url.clone(), yadis_url, services);

		self.store(&manager).await?;

		Ok(Some(manager))
	}

	/// Removes the cursor if [`DiscoveryManager::get_manager`] would return it.
	pub async fn destroy_manager(&self, force: bool) -> Result<()> {
		if self.get_manager(force).await?.is_some() {
			self.session.delete(&self.session_key).await?;
		}

		Ok(())
	}

	async fn store(&self, manager: &DiscoveredServices<E>) -> Result<()> {
		let value = SessionValue::Cursor(manager.clone()).encode()?;

		self.session.set(&self.session_key, value).await?;

		Ok(())
	}

	async fn load(&self) -> Result<Option<DiscoveredServices<E>>> {
		let Some(value) = self.session.get(&self.session_key).await? else { return Ok(None) };

		match SessionValue::<E>::decode(value) {
			Ok(SessionValue::Cursor(manager)) => Ok(Some(manager)),
			Ok(_) => {
				obs::log_session_value_discarded(&self.session_key, &"value is not a cursor");

				Ok(None)
			},
			Err(e) => {
				obs::log_session_value_discarded(&self.session_key, &e);

				Ok(None)
			},
		}
	}
}
impl<E> Debug for DiscoveryManager<E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DiscoveryManager")
			.field("url", &self.url)
			.field("session_key", &self.session_key)
			.finish_non_exhaustive()
	}
}
