//! Single-flight credential renewal with FIFO fan-out.
//!
//! [`RefreshCoordinator::obtain_fresh_credential`] collapses any number of concurrent "my
//! credential was rejected" events into one exchange with the [`RenewalAuthority`]. The first
//! caller claims the renewal slot and starts the exchange; every later caller joins the waiter
//! queue of the exchange already in flight. When the exchange settles the renewed credential is
//! stored, every waiter is resolved (or rejected) in the order it joined, and the slot is freed so
//! the next rejection starts a fresh renewal instead of rejoining a settled one.
//!
//! Checking the slot and claiming it happen under one lock that is never held across an `.await`,
//! so two exchanges with the authority are never outstanding at the same time. The exchange runs
//! on its own task: a caller that stops waiting (timeout, `select!`, aborted task) does not cancel
//! it for the others.

mod metrics;

pub use metrics::RenewalMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	authority::RenewalAuthority,
	error::RenewalError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TokenStore,
};

type RenewalResult = Result<TokenSecret, RenewalError>;
type Waiter = oneshot::Sender<RenewalResult>;

#[derive(Default)]
struct RenewalState {
	inflight: Option<InflightRenewal>,
	next_id: u64,
}

struct InflightRenewal {
	id: u64,
	waiters: Vec<Waiter>,
}

struct StartedRenewal {
	id: u64,
	refresh: TokenSecret,
}

/// Owns the in-flight renewal slot and its waiter queue for one client session.
pub struct RefreshCoordinator {
	store: TokenStore,
	authority: Arc<dyn RenewalAuthority>,
	state: Mutex<RenewalState>,
	metrics: Arc<RenewalMetrics>,
}
impl RefreshCoordinator {
	/// Creates a coordinator that renews through `authority` and writes into `store`.
	pub fn new(store: TokenStore, authority: Arc<dyn RenewalAuthority>) -> Self {
		Self { store, authority, state: Default::default(), metrics: Default::default() }
	}

	/// Shared renewal counters.
	pub fn metrics(&self) -> &Arc<RenewalMetrics> {
		&self.metrics
	}

	/// Returns `true` while an exchange is outstanding.
	pub fn is_renewing(&self) -> bool {
		self.state.lock().inflight.is_some()
	}

	/// Number of callers waiting on the outstanding exchange, initiator included.
	pub fn waiter_count(&self) -> usize {
		self.state.lock().inflight.as_ref().map_or(0, |inflight| inflight.waiters.len())
	}

	/// Obtains a fresh access credential, joining the renewal already underway if there is one.
	///
	/// Fails immediately with [`RenewalError::MissingRefreshToken`] when no renewal is in flight
	/// and no refresh credential is stored. Every other failure is the shared outcome of the
	/// exchange the caller joined.
	///
	/// Must be called from within a Tokio runtime; the exchange is spawned onto it.
	pub async fn obtain_fresh_credential(self: &Arc<Self>) -> Result<TokenSecret, RenewalError> {
		let (waiter, receipt) = oneshot::channel();
		let started = self.join_or_start(waiter).inspect_err(|_| self.metrics.record_failure())?;

		if let Some(started) = started {
			let coordinator = self.clone();

			tokio::spawn(async move { coordinator.drive(started).await });
		}

		receipt.await.unwrap_or(Err(RenewalError::Abandoned))
	}

	fn join_or_start(&self, waiter: Waiter) -> Result<Option<StartedRenewal>, RenewalError> {
		let mut state = self.state.lock();

		if let Some(inflight) = state.inflight.as_mut() {
			inflight.waiters.push(waiter);
			self.metrics.record_join();

			tracing::debug!(
				renewal = inflight.id,
				position = inflight.waiters.len(),
				"joined in-flight renewal"
			);

			return Ok(None);
		}

		let refresh = self.store.refresh().ok_or(RenewalError::MissingRefreshToken)?;
		let id = state.next_id;

		state.next_id = state.next_id.wrapping_add(1);
		state.inflight = Some(InflightRenewal { id, waiters: vec![waiter] });

		Ok(Some(StartedRenewal { id, refresh }))
	}

	async fn drive(&self, started: StartedRenewal) {
		const KIND: FlowKind = FlowKind::Renewal;

		let StartedRenewal { id, refresh } = started;
		let span = FlowSpan::new(KIND, "obtain_fresh_credential");
		let settle = SettleOnDrop { coordinator: self, id, armed: true };

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_exchange();

		let outcome = span
			.instrument(async {
				tracing::info!(renewal = id, "starting renewal exchange");

				let access = self.authority.renew(&refresh).await?;

				if self.store.replace_access_if_refresh(&refresh, access.clone()) {
					Ok(access)
				} else {
					Err(RenewalError::SessionEnded)
				}
			})
			.await;

		settle.complete(outcome);
	}

	fn settle(&self, id: u64, outcome: RenewalResult) {
		let Some(inflight) = self.state.lock().inflight.take_if(|inflight| inflight.id == id) else {
			return;
		};
		let waiters = inflight.waiters.len();

		match &outcome {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_flow_outcome(FlowKind::Renewal, FlowOutcome::Success);

				tracing::info!(renewal = id, waiters, "renewal succeeded");
			},
			Err(err) => {
				self.metrics.record_failure();
				obs::record_flow_outcome(FlowKind::Renewal, FlowOutcome::Failure);

				tracing::warn!(renewal = id, waiters, error = %err, "renewal failed");
			},
		}

		let mut queue = inflight.waiters.into_iter();
		let last = queue.next_back();

		for waiter in queue {
			let _ = waiter.send(outcome.clone());
		}
		if let Some(last) = last {
			let _ = last.send(outcome);
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("renewing", &self.is_renewing())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Settles the renewal as abandoned if the exchange task dies before settling (authority panic,
/// runtime shutdown).
struct SettleOnDrop<'a> {
	coordinator: &'a RefreshCoordinator,
	id: u64,
	armed: bool,
}
impl SettleOnDrop<'_> {
	fn complete(mut self, outcome: RenewalResult) {
		self.armed = false;
		self.coordinator.settle(self.id, outcome);
	}
}
impl Drop for SettleOnDrop<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.coordinator.settle(self.id, Err(RenewalError::Abandoned));
		}
	}
}
