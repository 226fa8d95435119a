use crate::event::types::{CallEvent, EventKind};
use crate::session::types::{CallSession, Outcome};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};

/// Counters from one reconstruction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructStats {
    /// CONNECT or terminal events whose call id matched no open session.
    pub orphaned_events: u64,
    /// Second (or later) terminal event for an already closed call id.
    pub duplicate_terminals: u64,
    /// Sessions still open at end of scan, flushed as Unknown.
    pub unterminated: u64,
}

#[derive(Debug)]
pub struct ReconstructResult {
    pub sessions: Vec<CallSession>,
    pub stats: ReconstructStats,
}

/// A call that has entered the queue but not yet seen a terminal event.
#[derive(Debug)]
struct OpenSession {
    queue_name: String,
    agent: Option<String>,
    enter_time: NaiveDateTime,
    connect_time: Option<NaiveDateTime>,
    last_seen: NaiveDateTime,
}

/// Pairs events sharing a call id into closed sessions.
///
/// Events must be fed in timestamp order. ENTER opens a session, CONNECT
/// resolves the agent and connect time, and the first terminal event closes
/// it; later terminals for the same call id are ignored and counted as
/// duplicates. CONNECT/terminal events with no matching open session are
/// dropped and counted as orphaned.
pub struct SessionReconstructor {
    open: HashMap<String, OpenSession>,
    closed_ids: HashSet<String>,
    sessions: Vec<CallSession>,
    stats: ReconstructStats,
}

impl SessionReconstructor {
    pub fn new() -> Self {
        Self {
            open: HashMap::new(),
            closed_ids: HashSet::new(),
            sessions: Vec::new(),
            stats: ReconstructStats::default(),
        }
    }

    pub fn process_event(&mut self, event: &CallEvent) {
        match &event.kind {
            EventKind::Enter => self.handle_enter(event),
            EventKind::Connect { .. } => self.handle_connect(event),
            kind if kind.is_terminal() => self.handle_terminal(event),
            _ => {
                // Unknown kinds only keep the session's last-seen clock fresh.
                if let Some(session) = self.open.get_mut(&event.call_id) {
                    session.last_seen = event.timestamp;
                }
            }
        }
    }

    /// Close every still-open session as Unknown and return the result.
    pub fn finish(mut self) -> ReconstructResult {
        // Flush in a stable order so repeated scans of the same log produce
        // identical output.
        let mut remaining: Vec<(String, OpenSession)> = self.open.drain().collect();
        remaining.sort_by(|a, b| (a.1.enter_time, &a.0).cmp(&(b.1.enter_time, &b.0)));

        for (call_id, open) in remaining {
            self.stats.unterminated += 1;
            self.sessions.push(CallSession {
                call_id,
                queue_name: open.queue_name,
                agent: open.agent,
                enter_time: open.enter_time,
                connect_time: open.connect_time,
                end_time: open.last_seen,
                duration_secs: 0,
                outcome: Outcome::Unknown,
            });
        }

        ReconstructResult {
            sessions: self.sessions,
            stats: self.stats,
        }
    }

    fn handle_enter(&mut self, event: &CallEvent) {
        // First ENTER wins; a repeat for an open or closed call id is noise.
        if self.closed_ids.contains(&event.call_id) || self.open.contains_key(&event.call_id) {
            return;
        }

        self.open.insert(
            event.call_id.clone(),
            OpenSession {
                queue_name: event.queue_name.clone(),
                agent: event.agent.clone(),
                enter_time: event.timestamp,
                connect_time: None,
                last_seen: event.timestamp,
            },
        );
    }

    fn handle_connect(&mut self, event: &CallEvent) {
        let Some(session) = self.open.get_mut(&event.call_id) else {
            self.stats.orphaned_events += 1;
            return;
        };

        session.last_seen = event.timestamp;
        if session.connect_time.is_none() {
            session.connect_time = Some(event.timestamp);
        }
        if let Some(agent) = &event.agent {
            session.agent = Some(agent.clone());
        }
    }

    fn handle_terminal(&mut self, event: &CallEvent) {
        let Some(open) = self.open.remove(&event.call_id) else {
            if self.closed_ids.contains(&event.call_id) {
                self.stats.duplicate_terminals += 1;
            } else {
                self.stats.orphaned_events += 1;
            }
            return;
        };

        let duration_secs = open
            .connect_time
            .map(|connect| (event.timestamp - connect).num_seconds().max(0))
            .unwrap_or(0);

        self.closed_ids.insert(event.call_id.clone());
        self.sessions.push(CallSession {
            call_id: event.call_id.clone(),
            queue_name: open.queue_name,
            agent: open.agent.or_else(|| event.agent.clone()),
            enter_time: open.enter_time,
            connect_time: open.connect_time,
            end_time: event.timestamp,
            duration_secs,
            outcome: classify(&event.kind),
        });
    }
}

impl Default for SessionReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed decision table mapping the closing event kind to an outcome.
fn classify(kind: &EventKind) -> Outcome {
    match kind {
        EventKind::CompleteAgent { .. } | EventKind::CompleteCaller { .. } => Outcome::Answered,
        EventKind::Abandon => Outcome::Abandoned,
        EventKind::RingNoAnswer | EventKind::ExitTimeout => Outcome::NoAnswer,
        EventKind::Busy => Outcome::Busy,
        EventKind::Failed => Outcome::Failed,
        EventKind::Enter | EventKind::Connect { .. } | EventKind::Unknown => Outcome::Unknown,
    }
}

/// Sort events by timestamp (stable, preserving log order for ties) and run
/// them through a reconstructor.
pub fn reconstruct_sessions(mut events: Vec<CallEvent>) -> ReconstructResult {
    events.sort_by_key(|e| e.timestamp);

    let mut reconstructor = SessionReconstructor::new();
    for event in &events {
        reconstructor.process_event(event);
    }
    reconstructor.finish()
}
