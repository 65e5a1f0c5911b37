//! Session configuration: API base, renewal endpoint, storage slot names, and teardown defaults.

/// Builder API and validation errors for [`SessionConfig`].
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError, store::StorageKeys};

/// Immutable, validated configuration shared by every component of a session client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
	/// API base every relative request path is joined onto (trailing slashes removed).
	pub base_url: Url,
	/// Path of the renewal endpoint, relative to `base_url`.
	pub refresh_path: String,
	/// Destination handed to the teardown action when no override is supplied.
	pub teardown_destination: String,
	/// Names of the credential slots inside the session medium.
	pub storage_keys: StorageKeys,
	/// Additional medium keys removed on session termination.
	pub teardown_keys: Vec<String>,
	/// Authorization scheme prefix attached before the access credential.
	pub auth_scheme: String,
}
impl SessionConfig {
	/// Default renewal endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Default teardown destination (the unauthenticated entry point).
	pub const DEFAULT_TEARDOWN_DESTINATION: &'static str = "/";
	/// Default authorization scheme.
	pub const DEFAULT_AUTH_SCHEME: &'static str = "Bearer";

	/// Creates a new builder for the provided API base.
	pub fn builder(base_url: Url) -> SessionConfigBuilder {
		SessionConfigBuilder::new(base_url)
	}

	/// Builds a default configuration from the API base stored in environment variable `var`.
	pub fn from_env(var: &str) -> Result<Self, SessionConfigError> {
		let raw = std::env::var(var)
			.map_err(|_| SessionConfigError::MissingEnvironment { var: var.to_owned() })?;

		SessionConfigBuilder::parse(&raw)?.build()
	}

	/// Returns the base URL without trailing slashes, ready for path concatenation.
	pub fn base(&self) -> &str {
		self.base_url.as_str().trim_end_matches('/')
	}

	/// Resolves a request path against the base URL; absolute URLs pass through unchanged.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		if let Ok(absolute) = Url::parse(path) {
			return Ok(absolute);
		}

		let joined = if path.is_empty() || path.starts_with('/') {
			format!("{}{path}", self.base())
		} else {
			format!("{}/{path}", self.base())
		};

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidRequestUrl { url: joined.clone(), source })
	}

	/// Absolute URL of the renewal endpoint.
	pub fn refresh_endpoint(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.refresh_path)
	}
}
