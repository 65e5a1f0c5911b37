//! Session termination: credential wipe followed by the teardown/redirect action.

// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TokenStore,
};

/// Navigation side effect performed after the credentials are wiped.
///
/// Implemented for any `Fn(&str) + Send + Sync` closure, which receives the destination.
pub trait TeardownAction
where
	Self: Send + Sync,
{
	/// Leaves the authenticated area, heading to `destination`.
	fn teardown(&self, destination: &str);
}
impl<F> TeardownAction for F
where
	F: Fn(&str) + Send + Sync,
{
	fn teardown(&self, destination: &str) {
		self(destination)
	}
}

/// Teardown action for contexts that manage navigation themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTeardown;
impl TeardownAction for NoopTeardown {
	fn teardown(&self, _destination: &str) {}
}

/// Where termination should send the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Redirect {
	/// The configured teardown destination.
	#[default]
	Default,
	/// An explicit destination override.
	To(String),
	/// Wipe credentials without any redirect.
	Suppress,
}

/// Clears the credential pair, then performs the teardown action.
#[derive(Clone)]
pub struct SessionTerminator {
	store: TokenStore,
	action: Arc<dyn TeardownAction>,
	default_destination: String,
}
impl SessionTerminator {
	/// Creates a terminator over `store` that redirects to `default_destination` by default.
	pub fn new(
		store: TokenStore,
		action: Arc<dyn TeardownAction>,
		default_destination: impl Into<String>,
	) -> Self {
		Self { store, action, default_destination: default_destination.into() }
	}

	/// Terminates the session.
	///
	/// Both credential slots are cleared before the teardown action runs, so the action never
	/// observes a stale credential. Terminating a session that is already empty is a no-op and
	/// returns `false`; concurrent failures of one session therefore redirect once.
	pub fn terminate(&self, redirect: Redirect) -> bool {
		let _span = FlowSpan::new(FlowKind::Teardown, "terminate").entered();

		if !self.store.clear() {
			tracing::debug!("session already empty, skipping teardown");

			return false;
		}

		obs::record_flow_outcome(FlowKind::Teardown, FlowOutcome::Success);

		let destination = match redirect {
			Redirect::Default => self.default_destination.as_str(),
			Redirect::To(ref destination) => destination.as_str(),
			Redirect::Suppress => {
				tracing::warn!("session terminated without redirect");

				return true;
			},
		};

		tracing::warn!(destination, "session terminated");
		self.action.teardown(destination);

		true
	}
}
impl Debug for SessionTerminator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionTerminator")
			.field("default_destination", &self.default_destination)
			.finish()
	}
}
