use chrono::NaiveDateTime;

/// One parsed queue_log line: an atomic state transition in a queued call's
/// life. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEvent {
    pub timestamp: NaiveDateTime,
    /// Opaque correlation key shared by all events of one call.
    pub call_id: String,
    pub queue_name: String,
    /// Normalized agent extension. None for queue-level events (raw agent
    /// field `NONE`, empty, or digit-less).
    pub agent: Option<String>,
    pub kind: EventKind,
}

/// Closed vocabulary of event kinds, carrying only the payload fields each
/// kind guarantees. Unrecognized tokens are quarantined as `Unknown` rather
/// than passed downstream as raw field maps.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Enter,
    Connect {
        hold_secs: Option<u32>,
    },
    CompleteAgent {
        hold_secs: Option<u32>,
        talk_secs: Option<u32>,
    },
    CompleteCaller {
        hold_secs: Option<u32>,
        talk_secs: Option<u32>,
    },
    Abandon,
    RingNoAnswer,
    ExitTimeout,
    Busy,
    Failed,
    Unknown,
}

impl EventKind {
    /// Whether this kind closes the session it belongs to.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::CompleteAgent { .. }
                | EventKind::CompleteCaller { .. }
                | EventKind::Abandon
                | EventKind::RingNoAnswer
                | EventKind::ExitTimeout
                | EventKind::Busy
                | EventKind::Failed
        )
    }
}
