//! Thread-safe in-memory [`SessionStorage`] implementation for local development and tests.

// self
use crate::{_prelude::*, store::SessionStorage};

type StorageMap = Arc<RwLock<HashMap<String, String>>>;

/// Process-local session medium; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(StorageMap);
impl MemoryStorage {
	/// Returns the number of populated keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no key is populated.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl SessionStorage for MemoryStorage {
	fn get(&self, key: &str) -> Option<String> {
		self.0.read().get(key).cloned()
	}

	fn set(&self, key: &str, value: String) {
		self.0.write().insert(key.to_owned(), value);
	}

	fn remove(&self, key: &str) -> bool {
		self.0.write().remove(key).is_some()
	}
}
