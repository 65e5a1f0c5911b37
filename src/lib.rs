//! Bearer credential relay for HTTP clients.
//!
//! Access tokens are attached to every call, concurrent `401`s collapse into a single renewal
//! exchange, each rejected request is replayed once, and the session is torn down
//! deterministically when recovery is impossible.
//!
//! The entry point is [`client::SessionClient`]. It wires together:
//!
//! - [`store::TokenStore`], the access/refresh slots over a session-scoped medium;
//! - [`augment::RequestAugmenter`], which attaches the access credential;
//! - [`classify::classify`], the failure decision table;
//! - [`coordinator::RefreshCoordinator`], the single-flight renewal slot + FIFO waiters;
//! - [`session::SessionTerminator`], which wipes credentials before redirecting.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod augment;
pub mod auth;
pub mod authority;
pub mod classify;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use ::http::{HeaderMap, HeaderValue, Method, StatusCode};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
