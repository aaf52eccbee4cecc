//! Session storage contract for persisted discovery state.

pub mod memory;

pub use memory::MemorySession;

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Boxed future returned by [`SessionStore`] operations.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + 'a + Send>>;

/// Key-value session backend holding JSON values.
///
/// Implementations own their locking; callers treat the store as an opaque map.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> SessionFuture<'a, Option<Value>>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set<'a>(&'a self, key: &'a str, value: Value) -> SessionFuture<'a, ()>;

	/// Removes `key`; missing keys are not an error.
	fn delete<'a>(&'a self, key: &'a str) -> SessionFuture<'a, ()>;
}

/// Error type produced by [`SessionStore`] implementations and the session codec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionError {
	/// A value could not be encoded into or decoded from its session form.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the session engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl From<serde_json::Error> for SessionError {
	fn from(e: serde_json::Error) -> Self {
		Self::Serialization { message: e.to_string() }
	}
}
