//! Relay-level error types shared across the transport, coordinator, and session layers.

// self
use crate::{_prelude::*, config::SessionConfigError, http::HttpResponse};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical relay error exposed by public APIs.
///
/// Renewal failures never appear here: the relay absorbs them and re-raises the original
/// failure in their place.
#[derive(Debug, ThisError)]
pub enum Error {
	/// No response reached the client (DNS, TCP, TLS, body read).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The server answered with a non-success status.
	#[error("Request failed with HTTP status {}.", .0.status())]
	Status(Box<HttpResponse>),
	/// The request could not be assembled locally.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns the HTTP status carried by the failure, if a response was received.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Status(response) => Some(response.status()),
			_ => None,
		}
	}

	/// Returns the failed response, if any.
	pub fn response(&self) -> Option<&HttpResponse> {
		match self {
			Self::Status(response) => Some(response),
			_ => None,
		}
	}

	/// Returns `true` when no response reached the client.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Transport(_))
	}
}

/// Local configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Session configuration failed validation.
	#[error(transparent)]
	Session(#[from] SessionConfigError),
	/// A request path could not be resolved against the base URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidRequestUrl {
		/// URL string that failed to parse.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// A header name or value supplied by the caller is malformed.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// A JSON request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
}

/// Transport-level failures (network, IO); no response was received.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Renewal failures fanned out to every waiter of a single exchange.
///
/// Every variant is fatal to the current session; callers terminate it.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RenewalError {
	/// No refresh credential is stored, so no renewal can start.
	#[error("No refresh token is available to renew the session.")]
	MissingRefreshToken,
	/// The authority answered without a usable access credential.
	#[error("Renewal endpoint returned an unusable response: {reason}.")]
	InvalidRenewalResponse {
		/// Parsing or validation failure summary.
		reason: String,
	},
	/// The authority rejected the refresh credential.
	#[error("Renewal endpoint rejected the refresh token with HTTP status {status}.")]
	Rejected {
		/// HTTP status returned by the authority.
		status: u16,
	},
	/// The authority could not be reached.
	#[error("Renewal endpoint is unreachable: {message}.")]
	Unreachable {
		/// Transport failure summary.
		message: String,
	},
	/// The session was torn down while the exchange was outstanding.
	#[error("Session ended before the renewal settled.")]
	SessionEnded,
	/// The future driving the exchange was dropped before it settled.
	#[error("Renewal was abandoned before it settled.")]
	Abandoned,
}
