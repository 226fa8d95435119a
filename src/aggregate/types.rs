use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One heatmap grid row: minutes of connected talk time per hour for one
/// (agent, date) pair. All 24 hour keys are present, zero-filled, because
/// the dashboard renders the full grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub agent: String,
    pub date: NaiveDate,
    pub hours: BTreeMap<u8, f64>,
    pub total_minutes: f64,
}

/// Per-agent call totals and outcome breakdown.
///
/// `total_calls` always equals the sum of the five outcome columns;
/// durations accumulate for answered sessions only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentSummary {
    pub agent: String,
    pub total_calls: u64,
    pub total_duration_sec: u64,
    pub total_duration_min: f64,
    pub answered: u64,
    pub abandoned: u64,
    pub no_answer: u64,
    pub busy: u64,
    pub failed: u64,
}

/// Sessions entering the queue in one hour-of-day bucket, collapsed across
/// all dates in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourlyVolume {
    pub hour: u8,
    pub calls: u64,
}

/// The full set of aggregate views for one scope — the unit cached and
/// returned. Immutable once built: refreshing a scope installs a new bundle,
/// never mutates a published one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateBundle {
    pub agents: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub heatmap: Vec<HeatmapRow>,
    pub agent_summary: Vec<AgentSummary>,
    pub hourly_volume: Vec<HourlyVolume>,
    pub total_records: u64,
    pub generated_at: DateTime<Utc>,
}

impl AggregateBundle {
    /// Field-wise equality ignoring the generation timestamp; used to assert
    /// pipeline determinism.
    pub fn same_aggregates(&self, other: &Self) -> bool {
        self.agents == other.agents
            && self.dates == other.dates
            && self.heatmap == other.heatmap
            && self.agent_summary == other.agent_summary
            && self.hourly_volume == other.hourly_volume
            && self.total_records == other.total_records
    }
}
