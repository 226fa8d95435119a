pub mod reconstruct;
pub mod types;

pub use reconstruct::{reconstruct_sessions, ReconstructResult, ReconstructStats, SessionReconstructor};
pub use types::{CallSession, Outcome};
