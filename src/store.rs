//! Storage contracts and the credential accessor layered on top of them.

pub mod memory;

pub use memory::MemoryStorage;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
};

/// Session-scoped key/value medium holding the credential slots.
///
/// Calls are synchronous so the refresh coordinator can read the refresh slot and claim the
/// renewal slot without an intervening suspension point. Implementations must be cheap to call
/// and must not block on I/O.
pub trait SessionStorage
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`.
	fn get(&self, key: &str) -> Option<String>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: String);

	/// Removes `key`, returning whether a value was present.
	fn remove(&self, key: &str) -> bool;
}

/// Names of the two credential slots inside the medium.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
	/// Slot holding the access credential.
	pub access: String,
	/// Slot holding the refresh credential.
	pub refresh: String,
}
impl Default for StorageKeys {
	fn default() -> Self {
		Self { access: "accessToken".into(), refresh: "refreshToken".into() }
	}
}

/// Accessor over the access + refresh slots of a [`SessionStorage`].
///
/// Clones share the same medium and the same write guard, so compound mutations
/// ([`TokenStore::replace_access_if_refresh`], [`TokenStore::clear`]) are atomic with respect to
/// each other.
#[derive(Clone)]
pub struct TokenStore {
	storage: Arc<dyn SessionStorage>,
	keys: StorageKeys,
	teardown_keys: Arc<[String]>,
	write_guard: Arc<Mutex<()>>,
}
impl TokenStore {
	/// Creates a store over `storage` using the provided slot names.
	pub fn new(storage: Arc<dyn SessionStorage>, keys: StorageKeys) -> Self {
		Self { storage, keys, teardown_keys: Arc::from(Vec::new()), write_guard: Default::default() }
	}

	/// Registers extra medium keys that are removed together with the credential pair.
	pub fn with_teardown_keys<I, S>(mut self, keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.teardown_keys = keys.into_iter().map(Into::into).collect();

		self
	}

	/// Returns the slot names in use.
	pub fn keys(&self) -> &StorageKeys {
		&self.keys
	}

	/// Reads the access credential.
	pub fn access(&self) -> Option<TokenSecret> {
		self.storage.get(&self.keys.access).and_then(TokenSecret::non_empty)
	}

	/// Reads the refresh credential.
	pub fn refresh(&self) -> Option<TokenSecret> {
		self.storage.get(&self.keys.refresh).and_then(TokenSecret::non_empty)
	}

	/// Reads both slots.
	pub fn pair(&self) -> CredentialPair {
		CredentialPair { access: self.access(), refresh: self.refresh() }
	}

	/// Replaces both slots at once.
	pub fn set_pair(&self, pair: CredentialPair) {
		let _guard = self.write_guard.lock();

		self.write_slot(&self.keys.access, pair.access);
		self.write_slot(&self.keys.refresh, pair.refresh);
	}

	/// Stores a renewed access credential only if the refresh slot still holds `expected_refresh`.
	///
	/// Returns `false` when the session was torn down (or re-established with another refresh
	/// credential) while the renewal was outstanding; nothing is written in that case.
	pub fn replace_access_if_refresh(
		&self,
		expected_refresh: &TokenSecret,
		access: TokenSecret,
	) -> bool {
		let _guard = self.write_guard.lock();

		if self.refresh().as_ref() != Some(expected_refresh) {
			return false;
		}

		self.write_slot(&self.keys.access, Some(access));

		true
	}

	/// Clears both credential slots plus the registered teardown keys.
	///
	/// Returns whether either credential slot held a value.
	pub fn clear(&self) -> bool {
		let _guard = self.write_guard.lock();
		let had_access = self.storage.remove(&self.keys.access);
		let had_refresh = self.storage.remove(&self.keys.refresh);

		for key in self.teardown_keys.iter() {
			self.storage.remove(key);
		}

		had_access || had_refresh
	}

	fn write_slot(&self, key: &str, value: Option<TokenSecret>) {
		match value {
			Some(secret) => self.storage.set(key, secret.expose().to_owned()),
			None => {
				self.storage.remove(key);
			},
		}
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("keys", &self.keys)
			.field("teardown_keys", &self.teardown_keys)
			.finish()
	}
}
