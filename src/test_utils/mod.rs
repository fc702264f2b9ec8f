//! Test utilities: data factories, in-memory repository implementations and
//! a builder that wires them into an `AppState` for HTTP-level tests.

mod app_state_builder;
mod factories;
mod mailserver_mock;
mod repo_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use mailserver_mock::*;
pub use repo_mocks::*;
