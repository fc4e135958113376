//! Reputation engine: EigenTrust scoring, sybil cluster detection, and
//! behavioral heuristics (spec §4.10–§4.13).

pub mod eigentrust;
pub mod heuristics;
pub mod job;
pub mod sybil;

pub use eigentrust::{EigenTrustResult, run_eigentrust, run_for_scope};
pub use job::{JobStatus, ReputationJob, ReputationRunSummary};
pub use sybil::SybilDetectionSummary;
