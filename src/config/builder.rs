// self
use crate::{_prelude::*, config::SessionConfig, store::StorageKeys};

/// Errors raised while constructing or validating a [`SessionConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionConfigError {
	/// The environment variable holding the API base is unset or not unicode.
	#[error("Environment variable `{var}` is not set.")]
	MissingEnvironment {
		/// Variable name that was read.
		var: String,
	},
	/// The raw API base could not be parsed.
	#[error("API base `{raw}` is not a valid URL: {reason}.")]
	InvalidBaseUrl {
		/// Raw value after trimming.
		raw: String,
		/// Parser message.
		reason: String,
	},
	/// The API base must use HTTP(S) and be able to act as a base.
	#[error("API base must be an http(s) URL that can carry paths: {url}.")]
	UnsupportedBaseUrl {
		/// URL that failed validation.
		url: String,
	},
	/// The renewal endpoint path must be non-empty and start with `/`.
	#[error("Refresh path `{path}` must start with `/`.")]
	InvalidRefreshPath {
		/// Path that failed validation.
		path: String,
	},
	/// Storage slot names must be non-empty and distinct.
	#[error("Storage keys must be non-empty and distinct (access `{access}`, refresh `{refresh}`).")]
	InvalidStorageKeys {
		/// Access slot name.
		access: String,
		/// Refresh slot name.
		refresh: String,
	},
	/// Authorization scheme must be a single non-empty token.
	#[error("Authorization scheme `{scheme}` must be a single non-empty token.")]
	InvalidAuthScheme {
		/// Scheme that failed validation.
		scheme: String,
	},
}

/// Builder for [`SessionConfig`] values.
#[derive(Debug)]
pub struct SessionConfigBuilder {
	/// API base for relative request paths.
	pub base_url: Url,
	/// Renewal endpoint path.
	pub refresh_path: String,
	/// Default teardown destination.
	pub teardown_destination: String,
	/// Credential slot names.
	pub storage_keys: StorageKeys,
	/// Extra keys wiped on termination.
	pub teardown_keys: Vec<String>,
	/// Authorization scheme.
	pub auth_scheme: String,
}
impl SessionConfigBuilder {
	/// Creates a new builder seeded with defaults for everything but the base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: SessionConfig::DEFAULT_REFRESH_PATH.into(),
			teardown_destination: SessionConfig::DEFAULT_TEARDOWN_DESTINATION.into(),
			storage_keys: StorageKeys::default(),
			teardown_keys: vec!["__oauth_state".into()],
			auth_scheme: SessionConfig::DEFAULT_AUTH_SCHEME.into(),
		}
	}

	/// Parses a raw API base, trimming surrounding whitespace and trailing slashes.
	pub fn parse(raw: &str) -> Result<Self, SessionConfigError> {
		let trimmed = raw.trim().trim_end_matches('/');
		let base_url = Url::parse(trimmed).map_err(|e| SessionConfigError::InvalidBaseUrl {
			raw: trimmed.to_owned(),
			reason: e.to_string(),
		})?;

		Ok(Self::new(base_url))
	}

	/// Overrides the renewal endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the default teardown destination.
	pub fn teardown_destination(mut self, destination: impl Into<String>) -> Self {
		self.teardown_destination = destination.into();

		self
	}

	/// Overrides the credential slot names.
	pub fn storage_keys(mut self, access: impl Into<String>, refresh: impl Into<String>) -> Self {
		self.storage_keys = StorageKeys { access: access.into(), refresh: refresh.into() };

		self
	}

	/// Replaces the extra keys wiped on termination.
	pub fn teardown_keys<I, S>(mut self, keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.teardown_keys = keys.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the authorization scheme.
	pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.auth_scheme = scheme.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<SessionConfig, SessionConfigError> {
		let config = SessionConfig {
			base_url: self.base_url,
			refresh_path: self.refresh_path,
			teardown_destination: self.teardown_destination,
			storage_keys: self.storage_keys,
			teardown_keys: self.teardown_keys,
			auth_scheme: self.auth_scheme,
		};

		config.validate()?;

		Ok(config)
	}
}

impl SessionConfig {
	fn validate(&self) -> Result<(), SessionConfigError> {
		validate_base_url(&self.base_url)?;

		if !self.refresh_path.starts_with('/') {
			return Err(SessionConfigError::InvalidRefreshPath { path: self.refresh_path.clone() });
		}

		let keys = &self.storage_keys;

		if keys.access.is_empty() || keys.refresh.is_empty() || keys.access == keys.refresh {
			return Err(SessionConfigError::InvalidStorageKeys {
				access: keys.access.clone(),
				refresh: keys.refresh.clone(),
			});
		}
		if self.auth_scheme.is_empty() || self.auth_scheme.chars().any(char::is_whitespace) {
			return Err(SessionConfigError::InvalidAuthScheme { scheme: self.auth_scheme.clone() });
		}

		Ok(())
	}
}

fn validate_base_url(url: &Url) -> Result<(), SessionConfigError> {
	if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() {
		Ok(())
	} else {
		Err(SessionConfigError::UnsupportedBaseUrl { url: url.to_string() })
	}
}
