//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	session::{SessionFuture, SessionStore},
};

type SessionMap = Arc<RwLock<HashMap<String, Value>>>;

/// Session backend that keeps values in-process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemorySession(SessionMap);
impl MemorySession {
	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// True when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl SessionStore for MemorySession {
	fn get<'a>(&'a self, key: &'a str) -> SessionFuture<'a, Option<Value>> {
		let value = self.0.read().get(key).cloned();

		Box::pin(async move { Ok(value) })
	}

	fn set<'a>(&'a self, key: &'a str, value: Value) -> SessionFuture<'a, ()> {
		self.0.write().insert(key.to_owned(), value);

		Box::pin(async { Ok(()) })
	}

	fn delete<'a>(&'a self, key: &'a str) -> SessionFuture<'a, ()> {
		self.0.write().remove(key);

		Box::pin(async { Ok(()) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[tokio::test]
	async fn set_get_delete_cycle() {
		let session = MemorySession::default();
		let shared = session.clone();

		session.set("k", json!({ "a": 1 })).await.expect("Setting a value should succeed.");

		assert_eq!(
			shared.get("k").await.expect("Reading a value should succeed."),
			Some(json!({ "a": 1 }))
		);
		assert_eq!(shared.len(), 1);

		session.delete("k").await.expect("Deleting a value should succeed.");
		session.delete("missing").await.expect("Deleting a missing key should succeed.");

		assert!(shared.is_empty());
		assert_eq!(shared.get("k").await.expect("Reading a value should succeed."), None);
	}
}
