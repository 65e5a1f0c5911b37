//! The augmented transport: credential attachment, failure classification, single-flight renewal,
//! and one replay per request.

// self
use crate::{
	_prelude::*,
	augment::RequestAugmenter,
	auth::{CredentialPair, TokenSecret},
	authority::{HttpRenewalAuthority, RenewalAuthority},
	classify::{self, Classification},
	config::SessionConfig,
	coordinator::{RefreshCoordinator, RenewalMetrics},
	error::RenewalError,
	http::{ApiRequest, HttpResponse, HttpTransport, Replayed},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{Redirect, SessionTerminator, TeardownAction},
	store::{SessionStorage, TokenStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Session client specialized for the crate's default reqwest transport.
pub type ReqwestSessionClient = SessionClient<ReqwestHttpClient>;

/// HTTP client wrapper that keeps one session's credentials alive.
///
/// Every request other than a call to the renewal authority gets the stored access credential
/// attached. A `401` triggers (or joins) a renewal through the shared [`RefreshCoordinator`] and
/// the request is replayed once with the renewed credential. Fatal classifications wipe the
/// credentials and run the teardown action. Callers only ever see a successful response or the
/// original failure.
///
/// Clones share the same store, coordinator, and transport.
pub struct SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	config: Arc<SessionConfig>,
	store: TokenStore,
	augmenter: RequestAugmenter,
	coordinator: Arc<RefreshCoordinator>,
	terminator: SessionTerminator,
}
impl<C> SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that renews through [`HttpRenewalAuthority`] on the same transport.
	pub fn with_transport(
		config: SessionConfig,
		storage: Arc<dyn SessionStorage>,
		teardown: Arc<dyn TeardownAction>,
		transport: impl Into<Arc<C>>,
	) -> Self {
		let config = Arc::new(config);
		let transport = transport.into();
		let store = TokenStore::new(storage, config.storage_keys.clone())
			.with_teardown_keys(config.teardown_keys.iter().cloned());
		let authority: Arc<dyn RenewalAuthority> =
			Arc::new(HttpRenewalAuthority::new(transport.clone(), config.clone()));

		Self {
			augmenter: RequestAugmenter::new(store.clone(), config.auth_scheme.clone()),
			coordinator: Arc::new(RefreshCoordinator::new(store.clone(), authority)),
			terminator: SessionTerminator::new(
				store.clone(),
				teardown,
				config.teardown_destination.clone(),
			),
			transport,
			config,
			store,
		}
	}

	/// Replaces the renewal authority, starting from a fresh coordinator.
	pub fn with_authority(mut self, authority: Arc<dyn RenewalAuthority>) -> Self {
		self.coordinator = Arc::new(RefreshCoordinator::new(self.store.clone(), authority));

		self
	}

	/// Validated configuration in use.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Credential accessor shared by every component.
	pub fn store(&self) -> &TokenStore {
		&self.store
	}

	/// Renewal coordinator for this session.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Renewal counters for this session.
	pub fn renewal_metrics(&self) -> &Arc<RenewalMetrics> {
		self.coordinator.metrics()
	}

	/// Stores the credential pair obtained by an external login or callback.
	pub fn login(&self, access: impl Into<String>, refresh: impl Into<String>) {
		self.store.set_pair(CredentialPair::new(access, refresh));

		tracing::info!("session credentials stored");
	}

	/// Ends the session; returns whether any credential was present.
	pub fn logout(&self, redirect: Redirect) -> bool {
		self.terminator.terminate(redirect)
	}

	/// Returns `true` while an access credential is stored.
	pub fn is_authenticated(&self) -> bool {
		self.store.access().is_some()
	}

	/// Returns the stored access credential.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.store.access()
	}

	/// Sends `request` through augmentation, classification, and at most one replay.
	pub async fn send(&self, request: ApiRequest) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.relay(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn relay(&self, request: ApiRequest) -> Result<HttpResponse> {
		let mut request = self.augmenter.augment(request);

		loop {
			let outcome = self.transmit(&request).await?;
			let class = classify::classify(&request, &outcome, || self.store.refresh().is_some());

			obs::record_classification(class);
			tracing::debug!(
				method = %request.method,
				path = %request.path,
				target = request.target.as_str(),
				retried = request.is_retried(),
				class = class.as_str(),
				"classified response"
			);

			match class {
				Classification::Success | Classification::TransportFailure |
				Classification::Passthrough => return self.finish(&request, outcome),
				Classification::Forbidden | Classification::UnauthorizedAtAuthority => {
					self.terminator.terminate(Redirect::Default);

					return outcome;
				},
				Classification::UnauthorizedRetriable => {
					match self.coordinator.obtain_fresh_credential().await {
						Ok(credential) => {
							request.mark_retried();
							request = self.augmenter.attach(request, Some(&credential));
						},
						Err(RenewalError::Abandoned) => {
							tracing::warn!(
								path = %request.path,
								"renewal died before settling, keeping the session"
							);

							return outcome;
						},
						Err(err) => {
							tracing::warn!(
								path = %request.path,
								error = %err,
								"renewal failed, ending session"
							);
							self.terminator.terminate(Redirect::Default);

							return outcome;
						},
					}
				},
			}
		}
	}

	/// Sends one attempt. The outer `Err` is a local build failure that never reached the wire.
	async fn transmit(&self, request: &ApiRequest) -> Result<Result<HttpResponse>> {
		let http_request = request.to_http(&self.config)?;

		tracing::debug!(
			method = %request.method,
			url = %http_request.uri(),
			credential = request.headers.contains_key(::http::header::AUTHORIZATION),
			"sending request"
		);

		Ok(match self.transport.execute(http_request).await {
			Ok(response) if response.status().is_success() => Ok(response),
			Ok(response) => Err(Error::Status(Box::new(response))),
			Err(err) => {
				tracing::debug!(path = %request.path, error = %err, "no response received");

				Err(err.into())
			},
		})
	}

	fn finish(&self, request: &ApiRequest, outcome: Result<HttpResponse>) -> Result<HttpResponse> {
		let mut response = outcome?;

		if request.is_retried() {
			response.extensions_mut().insert(Replayed);
		}

		Ok(response)
	}
}
impl<C> Clone for SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			store: self.store.clone(),
			augmenter: self.augmenter.clone(),
			coordinator: self.coordinator.clone(),
			terminator: self.terminator.clone(),
		}
	}
}
#[cfg(feature = "reqwest")]
impl SessionClient<ReqwestHttpClient> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(
		config: SessionConfig,
		storage: Arc<dyn SessionStorage>,
		teardown: Arc<dyn TeardownAction>,
	) -> Self {
		Self::with_transport(config, storage, teardown, ReqwestHttpClient::default())
	}
}
impl<C> Debug for SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("authenticated", &self.is_authenticated())
			.field("coordinator", &self.coordinator)
			.finish()
	}
}
