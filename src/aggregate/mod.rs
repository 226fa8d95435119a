pub mod builder;
pub mod scope;
pub mod types;

pub use builder::build_bundle;
pub use scope::QueryScope;
pub use types::{AggregateBundle, AgentSummary, HeatmapRow, HourlyVolume};
