//! Renewal authority contract and the default HTTP-backed implementation.
//!
//! The authority accepts a refresh credential and answers with a new access credential. Any
//! failure status is a rejection; the status detail is only kept for logs.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::SessionConfig,
	error::RenewalError,
	http::{ApiRequest, HttpTransport, RequestTarget, header::ACCEPT},
};

/// Boxed future returned by [`RenewalAuthority::renew`].
pub type RenewalFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenSecret, RenewalError>> + 'a + Send>>;

/// Exchanges a refresh credential for a new access credential.
pub trait RenewalAuthority
where
	Self: Send + Sync,
{
	/// Performs one renewal exchange.
	fn renew<'a>(&'a self, refresh: &'a TokenSecret) -> RenewalFuture<'a>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenewalRequestBody<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenewalResponseBody {
	#[serde(default)]
	access_token: Option<String>,
}

/// Authority that `POST`s `{"refreshToken": ...}` to the configured renewal endpoint and reads
/// `accessToken` from the JSON answer.
///
/// The call goes straight to the transport: it is never augmented, classified, or replayed.
pub struct HttpRenewalAuthority<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	config: Arc<SessionConfig>,
}
impl<C> HttpRenewalAuthority<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates an authority that reuses `transport` and the renewal endpoint from `config`.
	pub fn new(transport: Arc<C>, config: Arc<SessionConfig>) -> Self {
		Self { transport, config }
	}

	fn build_request(&self, refresh: &TokenSecret) -> Result<ApiRequest, RenewalError> {
		let invalid = |e: crate::error::ConfigError| RenewalError::Unreachable {
			message: format!("renewal request could not be built: {e}"),
		};

		ApiRequest::post(self.config.refresh_path.clone())
			.targeting(RequestTarget::RenewalAuthority)
			.json(&RenewalRequestBody { refresh_token: refresh.expose() })
			.map_err(invalid)?
			.header(ACCEPT.as_str(), "application/json")
			.map_err(invalid)
	}
}
impl<C> RenewalAuthority for HttpRenewalAuthority<C>
where
	C: ?Sized + HttpTransport,
{
	fn renew<'a>(&'a self, refresh: &'a TokenSecret) -> RenewalFuture<'a> {
		Box::pin(async move {
			let request = self.build_request(refresh)?.to_http(&self.config).map_err(|e| {
				RenewalError::Unreachable { message: format!("renewal request could not be built: {e}") }
			})?;
			let response = self
				.transport
				.execute(request)
				.await
				.map_err(|e| RenewalError::Unreachable { message: e.to_string() })?;
			let status = response.status();

			if !status.is_success() {
				return Err(RenewalError::Rejected { status: status.as_u16() });
			}

			parse_access_token(response.body())
		})
	}
}
impl<C> Debug for HttpRenewalAuthority<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRenewalAuthority")
			.field("refresh_path", &self.config.refresh_path)
			.finish()
	}
}

fn parse_access_token(body: &[u8]) -> Result<TokenSecret, RenewalError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let parsed: RenewalResponseBody = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| RenewalError::InvalidRenewalResponse { reason: e.to_string() })?;

	parsed.access_token.and_then(TokenSecret::non_empty).ok_or_else(|| {
		RenewalError::InvalidRenewalResponse { reason: "response is missing accessToken".into() }
	})
}
