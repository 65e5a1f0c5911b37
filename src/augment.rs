//! Credential attachment for outgoing requests.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	http::{ApiRequest, header::AUTHORIZATION},
	store::TokenStore,
};

/// Attaches the stored access credential to outgoing requests.
#[derive(Clone, Debug)]
pub struct RequestAugmenter {
	store: TokenStore,
	scheme: String,
}
impl RequestAugmenter {
	/// Creates an augmenter reading from `store` and prefixing credentials with `scheme`.
	pub fn new(store: TokenStore, scheme: impl Into<String>) -> Self {
		Self { store, scheme: scheme.into() }
	}

	/// Attaches whatever access credential is currently stored.
	///
	/// Calls addressed to the renewal authority carry the refresh credential in their body and
	/// are returned untouched.
	pub fn augment(&self, request: ApiRequest) -> ApiRequest {
		if request.is_renewal_call() {
			return request;
		}

		let credential = self.store.access();

		self.attach(request, credential.as_ref())
	}

	/// Sets `Authorization` from `credential`, or returns `request` unchanged when it is absent.
	///
	/// A credential that cannot be encoded as a header value is skipped.
	pub fn attach(&self, mut request: ApiRequest, credential: Option<&TokenSecret>) -> ApiRequest {
		let Some(credential) = credential else {
			tracing::debug!(method = %request.method, path = %request.path, "no credential to attach");

			return request;
		};

		match HeaderValue::from_str(&format!("{} {}", self.scheme, credential.expose())) {
			Ok(mut value) => {
				value.set_sensitive(true);
				request.headers.insert(AUTHORIZATION, value);

				tracing::debug!(
					method = %request.method,
					path = %request.path,
					retried = request.is_retried(),
					"credential attached"
				);
			},
			Err(_) => {
				tracing::warn!(
					path = %request.path,
					"stored credential is not a valid header value, sending without it"
				);
			},
		}

		request
	}
}
