//! Access/refresh credential pair held by the token store.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Snapshot of both credential slots.
///
/// Either slot may be absent. The pair is only ever cleared as a whole.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Bearer credential attached to outgoing requests.
	pub access: Option<TokenSecret>,
	/// Credential exchanged with the renewal authority for a new access credential.
	pub refresh: Option<TokenSecret>,
}
impl CredentialPair {
	/// Builds a pair from raw strings, treating empty strings as absent.
	pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
		Self { access: TokenSecret::non_empty(access), refresh: TokenSecret::non_empty(refresh) }
	}

	/// Returns `true` when neither slot holds a credential.
	pub fn is_empty(&self) -> bool {
		self.access.is_none() && self.refresh.is_none()
	}

	/// Returns `true` when a renewal could be attempted.
	pub fn can_renew(&self) -> bool {
		self.refresh.is_some()
	}
}
