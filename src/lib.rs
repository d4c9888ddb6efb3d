//! Client library for the Octro table-extraction service.
//!
//! The backend owns PDF parsing, table detection, authentication and
//! billing; this crate orchestrates the user-facing side of it: a shared
//! session store, the upload → confirm → process → results workflow, a
//! results view with per-table question answering, and the account/billing
//! calls. Everything talks to a single configurable HTTP origin with the
//! session cookie attached.

pub mod account;
pub mod api;
pub mod config;
pub mod error;
pub mod results;
pub mod session;
pub mod workflow;

pub use api::ApiClient;
pub use config::Config;
pub use error::{ClientError, Result};
pub use results::ResultsView;
pub use session::{AuthState, SessionStore};
pub use workflow::{Workflow, WorkflowState};
