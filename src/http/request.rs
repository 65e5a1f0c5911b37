//! Outgoing request descriptor carried through augmentation, classification, and replay.

// self
use crate::{
	_prelude::*,
	config::SessionConfig,
	error::ConfigError,
	http::{HttpRequest, header::CONTENT_TYPE},
};

/// Who a request is addressed to.
///
/// The tag decides whether a failed response can trigger a renewal. Requests addressed to the
/// renewal authority never do: a rejection there means the refresh credential itself is dead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestTarget {
	/// Ordinary API call eligible for credential attachment and one replay.
	#[default]
	Api,
	/// Call to the renewal authority itself.
	RenewalAuthority,
}
impl RequestTarget {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestTarget::Api => "api",
			RequestTarget::RenewalAuthority => "renewal_authority",
		}
	}
}

/// Outgoing request plus the replay bookkeeping the relay needs.
///
/// `path` may be relative (joined onto [`SessionConfig::base_url`]) or an absolute URL.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Relative path or absolute URL.
	pub path: String,
	/// Request headers; `Authorization` is managed by the relay.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
	/// Addressee tag.
	pub target: RequestTarget,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request for `method` + `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: None,
			target: RequestTarget::Api,
			retried: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Adds a header, rejecting malformed names or values.
	pub fn header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
		let invalid = || ConfigError::InvalidHeader { name: name.to_owned() };
		let header_name = ::http::header::HeaderName::from_bytes(name.as_bytes())
			.map_err(|_| invalid())?;
		let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;

		self.headers.insert(header_name, header_value);

		Ok(self)
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `payload` as the JSON body and sets `Content-Type`.
	pub fn json<T>(mut self, payload: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(payload)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Overrides the addressee tag.
	pub fn targeting(mut self, target: RequestTarget) -> Self {
		self.target = target;

		self
	}

	/// Returns `true` once the request has been replayed after a renewal.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	/// Returns `true` when the request is addressed to the renewal authority.
	pub fn is_renewal_call(&self) -> bool {
		self.target == RequestTarget::RenewalAuthority
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}

	/// Resolves the path and assembles the transport-level request.
	pub fn to_http(&self, config: &SessionConfig) -> Result<HttpRequest, ConfigError> {
		let url = config.resolve(&self.path)?;
		let mut request = ::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;

		*request.headers_mut() = self.headers.clone();

		Ok(request)
	}
}
