//! Failure classification for completed transmissions.
//!
//! [`classify`] is the relay's decision table. It is pure: acting on the result (terminating the
//! session, renewing, replaying) is the job of [`crate::client::SessionClient`].

// self
use crate::{
	_prelude::*,
	http::{ApiRequest, HttpResponse},
};

/// Disposition of a completed transmission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
	/// A success response.
	Success,
	/// No response reached the client; propagate untouched.
	TransportFailure,
	/// `403`; terminate the session.
	Forbidden,
	/// `401` on a request that has not been replayed yet while a refresh credential is stored.
	UnauthorizedRetriable,
	/// The renewal call itself failed, or a `401` arrived with no refresh credential to recover
	/// with; terminate the session.
	UnauthorizedAtAuthority,
	/// Any other failure (including a `401` on an already replayed request); propagate unchanged.
	Passthrough,
}
impl Classification {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Classification::Success => "success",
			Classification::TransportFailure => "transport_failure",
			Classification::Forbidden => "forbidden",
			Classification::UnauthorizedRetriable => "unauthorized_retriable",
			Classification::UnauthorizedAtAuthority => "unauthorized_at_authority",
			Classification::Passthrough => "passthrough",
		}
	}

	/// Returns `true` for classifications that end the session.
	pub const fn is_fatal(self) -> bool {
		matches!(self, Classification::Forbidden | Classification::UnauthorizedAtAuthority)
	}
}
impl Display for Classification {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Classifies `outcome` for `request`.
///
/// `refresh_available` is only consulted for a first-time `401`.
pub fn classify(
	request: &ApiRequest,
	outcome: &Result<HttpResponse>,
	refresh_available: impl FnOnce() -> bool,
) -> Classification {
	let status = match outcome {
		Ok(response) if response.status().is_success() => return Classification::Success,
		Ok(response) => response.status(),
		Err(err) => match err.status() {
			Some(status) => status,
			None => return Classification::TransportFailure,
		},
	};

	if request.is_renewal_call() {
		return Classification::UnauthorizedAtAuthority;
	}
	if status == StatusCode::FORBIDDEN {
		return Classification::Forbidden;
	}
	if status == StatusCode::UNAUTHORIZED && !request.is_retried() {
		return if refresh_available() {
			Classification::UnauthorizedRetriable
		} else {
			Classification::UnauthorizedAtAuthority
		};
	}

	Classification::Passthrough
}
