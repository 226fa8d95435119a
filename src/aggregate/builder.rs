use crate::aggregate::scope::QueryScope;
use crate::aggregate::types::{AggregateBundle, AgentSummary, HeatmapRow, HourlyVolume};
use crate::session::types::{CallSession, Outcome};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Fold closed sessions into the three aggregate views for one scope.
///
/// Filtering happens before aggregation so summary totals reflect exactly
/// the sessions in scope. The date filter applies to every view; the agent
/// filter applies to the heatmap and the agent summary but not to hourly
/// volume, which is always queue-wide.
///
/// `total_records` is the number of parsed events behind `sessions`, and
/// `generated_at` is stamped by the caller so that building stays a pure
/// function of its inputs.
pub fn build_bundle(
    sessions: &[CallSession],
    scope: &QueryScope,
    total_records: u64,
    generated_at: DateTime<Utc>,
) -> AggregateBundle {
    let date_scoped: Vec<&CallSession> = sessions
        .iter()
        .filter(|s| scope.date_in_range(s.enter_time.date()))
        .collect();
    let in_scope: Vec<&CallSession> = date_scoped
        .iter()
        .copied()
        .filter(|s| scope.matches_agent(s.agent.as_deref()))
        .collect();

    let mut agents: BTreeSet<String> = BTreeSet::new();
    let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();

    for session in &date_scoped {
        dates.insert(session.enter_time.date());
    }
    for session in &in_scope {
        if let Some(agent) = &session.agent {
            agents.insert(agent.clone());
        }
    }

    // Talk seconds per (date, hour) bucket, nested under the agent.
    // Accumulation stays in whole seconds; minutes and rounding are output
    // formatting only.
    let mut heat: HashMap<String, HashMap<(NaiveDate, u8), i64>> = HashMap::new();
    for session in &in_scope {
        if session.outcome != Outcome::Answered {
            continue;
        }
        let (Some(agent), Some(connect)) = (&session.agent, session.connect_time) else {
            continue;
        };

        let buckets = heat.entry(agent.clone()).or_default();
        for (date, hour, secs) in hour_buckets(connect, session.end_time) {
            *buckets.entry((date, hour)).or_insert(0) += secs;
            // A session talking past midnight lands buckets on a date no
            // session entered on; keep that date on the axis.
            dates.insert(date);
        }
    }

    let mut stats: HashMap<String, AgentSummary> = HashMap::new();
    for session in &in_scope {
        let Some(agent) = &session.agent else {
            continue;
        };
        // Unterminated sessions appear in no per-agent view, keeping
        // total_calls equal to the sum of the outcome columns.
        if session.outcome == Outcome::Unknown {
            continue;
        }

        let entry = stats.entry(agent.clone()).or_default();
        entry.total_calls += 1;
        match session.outcome {
            Outcome::Answered => {
                entry.answered += 1;
                entry.total_duration_sec += session.duration_secs.max(0) as u64;
            }
            Outcome::Abandoned => entry.abandoned += 1,
            Outcome::NoAnswer => entry.no_answer += 1,
            Outcome::Busy => entry.busy += 1,
            Outcome::Failed => entry.failed += 1,
            Outcome::Unknown => unreachable!(),
        }
    }

    let mut hourly = [0u64; 24];
    for session in &date_scoped {
        hourly[session.enter_time.hour() as usize] += 1;
    }

    let agents: Vec<String> = agents.into_iter().collect();
    let dates: Vec<NaiveDate> = dates.into_iter().collect();

    // Full agents x dates grid, all 24 hour keys per row.
    let mut heatmap = Vec::with_capacity(agents.len() * dates.len());
    for agent in &agents {
        let buckets = heat.get(agent);
        for date in &dates {
            let mut hours = BTreeMap::new();
            let mut total_minutes = 0.0;
            for hour in 0..24u8 {
                let secs = buckets
                    .and_then(|b| b.get(&(*date, hour)))
                    .copied()
                    .unwrap_or(0);
                let minutes = round1(secs as f64 / 60.0);
                total_minutes += minutes;
                hours.insert(hour, minutes);
            }
            heatmap.push(HeatmapRow {
                agent: agent.clone(),
                date: *date,
                hours,
                total_minutes: round1(total_minutes),
            });
        }
    }

    let agent_summary = agents
        .iter()
        .map(|agent| {
            let mut row = stats.remove(agent).unwrap_or_default();
            row.agent = agent.clone();
            row.total_duration_min = round1(row.total_duration_sec as f64 / 60.0);
            row
        })
        .collect();

    let hourly_volume = (0..24u8)
        .map(|hour| HourlyVolume {
            hour,
            calls: hourly[hour as usize],
        })
        .collect();

    AggregateBundle {
        agents,
        dates,
        heatmap,
        agent_summary,
        hourly_volume,
        total_records,
        generated_at,
    }
}

/// Split the connected interval `[connect, end)` into per-hour segments.
///
/// Every second of the interval lands in exactly one bucket, so the bucket
/// sums of a session always add back up to its duration.
fn hour_buckets(connect: NaiveDateTime, end: NaiveDateTime) -> Vec<(NaiveDate, u8, i64)> {
    let mut buckets = Vec::new();
    let mut cursor = connect;

    while cursor < end {
        let hour_start = cursor
            .date()
            .and_hms_opt(cursor.hour(), 0, 0)
            .expect("hour start is a valid time");
        let next_hour = hour_start + chrono::Duration::hours(1);
        let segment_end = end.min(next_hour);

        buckets.push((
            cursor.date(),
            cursor.hour() as u8,
            (segment_end - cursor).num_seconds(),
        ));
        cursor = segment_end;
    }

    buckets
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
