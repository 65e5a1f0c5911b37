//! Transport primitives for relayed requests.
//!
//! The module exposes [`HttpTransport`], the relay's only dependency on an HTTP stack, plus the
//! [`ApiRequest`] descriptor that flows through augmentation, classification, and the single
//! permitted replay. Transports report *every* HTTP response as `Ok`, whatever its status;
//! `Err` is reserved for failures where no response reached the client, which is what lets the
//! classifier tell a network outage apart from a rejected credential.

pub mod request;

pub use ::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use request::*;

// self
use crate::{_prelude::*, error::TransportError};

/// Outbound request handed to a transport.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Fully buffered response returned by a transport.
pub type HttpResponse = ::http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP clients capable of sending relayed requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the session
/// client and the renewal authority behind an `Arc`.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the response body.
	///
	/// Non-success statuses must be returned as `Ok`; only failures without any response are
	/// errors.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Marker inserted into the extensions of a response produced by the single replay that follows
/// a successful renewal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Replayed;

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl std::ops::Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok::<_, TransportError>(response_new)
		})
	}
}
