#![allow(dead_code)]

// std
use std::sync::{Arc, Mutex};
// self
use credential_relay::{
	client::ReqwestSessionClient, config::SessionConfigBuilder, http::ReqwestHttpClient, reqwest,
	store::MemoryStorage,
};

/// Destinations handed to the teardown action, in call order.
pub type Visits = Arc<Mutex<Vec<String>>>;

/// Reqwest-backed client wired to an inspectable medium and a recording teardown action.
pub struct Harness {
	pub client: ReqwestSessionClient,
	pub storage: MemoryStorage,
	pub visits: Visits,
}
impl Harness {
	pub fn visits(&self) -> Vec<String> {
		self.visits.lock().expect("Visit log lock should not be poisoned.").clone()
	}
}

pub fn harness(base: &str) -> Harness {
	let config = SessionConfigBuilder::parse(base)
		.expect("Mock server base URL should parse.")
		.build()
		.expect("Session config fixture should validate.");
	let storage = MemoryStorage::default();
	let visits = Visits::default();
	let teardown = {
		let visits = visits.clone();

		move |destination: &str| {
			visits.lock().expect("Visit log lock should not be poisoned.").push(destination.into());
		}
	};
	// The mock server speaks TLS with a self-signed certificate.
	let http = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Reqwest client should build.");
	let client = ReqwestSessionClient::with_transport(
		config,
		Arc::new(storage.clone()),
		Arc::new(teardown),
		ReqwestHttpClient::with_client(http),
	);

	Harness { client, storage, visits }
}
