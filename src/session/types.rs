use chrono::NaiveDateTime;

/// Final classification of a reconstructed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Answered,
    Abandoned,
    NoAnswer,
    Busy,
    Failed,
    /// No terminal event observed by end of scan.
    Unknown,
}

/// The reconstructed life of one call, from queue entry to terminal outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSession {
    pub call_id: String,
    pub queue_name: String,
    /// Unresolved when no event of the call ever named an agent.
    pub agent: Option<String>,
    pub enter_time: NaiveDateTime,
    pub connect_time: Option<NaiveDateTime>,
    pub end_time: NaiveDateTime,
    /// Connected talk time. Zero when the call never connected, and always
    /// zero for `Outcome::Unknown` sessions (excluded from duration totals).
    pub duration_secs: i64,
    pub outcome: Outcome,
}

impl CallSession {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_secs as f64 / 60.0
    }
}
