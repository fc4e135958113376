//! Record and identity ingestion: validation, trust gating, account-age
//! resolution, and the trust-gated record dispatcher that fans events out
//! to `forum-db`'s indexers (§4.2, §4.4, §4.5, §4.6).

pub mod account_age;
pub mod dispatcher;
pub mod identity;
pub mod repo_tracker;
pub mod service;
pub mod validator;

pub use account_age::AccountAgeOracle;
pub use dispatcher::{DispatchError, Dispatcher};
