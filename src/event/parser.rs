use crate::event::types::{CallEvent, EventKind};
use crate::source::timestamp::TimestampFormat;
use regex::Regex;
use std::sync::OnceLock;

/// Counters from one full scan of the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub total_lines: u64,
    pub parsed_events: u64,
    pub skipped_lines: u64,
}

/// Result of parsing the full raw log.
#[derive(Debug)]
pub struct ParsedLog {
    pub events: Vec<CallEvent>,
    pub stats: ScanStats,
}

/// Parses raw queue_log text into typed events.
///
/// Line grammar: `<timestamp>|<callid>|<queuename>|<agent>|<event>[|dataN...]`.
/// Parsing is pure and restartable: scanning the same input twice yields
/// identical output. Lines that fail the grammar are counted as skipped and
/// never abort the scan, so rotation artifacts and malformed rows pass
/// through harmlessly.
pub struct EventParser {
    timestamp: TimestampFormat,
}

impl EventParser {
    pub fn new(timestamp: TimestampFormat) -> Self {
        Self { timestamp }
    }

    /// Scan the full log text (or an incremental suffix of it).
    pub fn parse_log(&self, raw: &str) -> ParsedLog {
        let mut events = Vec::new();
        let mut stats = ScanStats::default();

        for line in raw.lines() {
            stats.total_lines += 1;

            if line.trim().is_empty() {
                continue;
            }

            match self.parse_line(line) {
                Some(event) => {
                    events.push(event);
                    stats.parsed_events += 1;
                }
                None => stats.skipped_lines += 1,
            }
        }

        ParsedLog { events, stats }
    }

    /// Parse one line; None means the line does not match the field grammar.
    fn parse_line(&self, line: &str) -> Option<CallEvent> {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 5 {
            return None;
        }

        let timestamp = self.timestamp.parse(fields[0].trim()).ok()?;
        let call_id = fields[1].trim();
        let queue_name = fields[2].trim();
        if call_id.is_empty() || queue_name.is_empty() {
            return None;
        }

        let agent = agent_extension(fields[3]);
        let data1 = fields.get(5).copied();
        let data2 = fields.get(6).copied();
        let kind = parse_kind(fields[4], data1, data2);

        Some(CallEvent {
            timestamp,
            call_id: call_id.to_string(),
            queue_name: queue_name.to_string(),
            agent,
            kind,
        })
    }
}

/// Turn a raw channel string like `PJSIP/102` into the extension `102`.
///
/// `NONE`, empty, and digit-less strings mean no agent. The same rule
/// normalizes agent filters on incoming queries, so a filter expressed as
/// either `102` or `PJSIP/102` matches the events it should.
pub fn agent_extension(raw: &str) -> Option<String> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").unwrap());

    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return None;
    }
    digits.find(raw).map(|m| m.as_str().to_string())
}

fn parse_kind(token: &str, data1: Option<&str>, data2: Option<&str>) -> EventKind {
    let hold_secs = data1.and_then(|v| v.trim().parse().ok());
    let talk_secs = data2.and_then(|v| v.trim().parse().ok());

    match token.trim().to_ascii_uppercase().as_str() {
        "ENTERQUEUE" => EventKind::Enter,
        "CONNECT" => EventKind::Connect { hold_secs },
        "COMPLETEAGENT" => EventKind::CompleteAgent {
            hold_secs,
            talk_secs,
        },
        "COMPLETECALLER" => EventKind::CompleteCaller {
            hold_secs,
            talk_secs,
        },
        "ABANDON" => EventKind::Abandon,
        "RINGNOANSWER" => EventKind::RingNoAnswer,
        "EXITWITHTIMEOUT" => EventKind::ExitTimeout,
        "BUSY" => EventKind::Busy,
        "FAILED" => EventKind::Failed,
        _ => EventKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> EventParser {
        EventParser::new(TimestampFormat::Epoch)
    }

    #[test]
    fn test_parse_enter_line() {
        let log = parser().parse_log("1733280000|C1|sales|NONE|ENTERQUEUE\n");

        assert_eq!(log.events.len(), 1);
        let event = &log.events[0];
        assert_eq!(event.call_id, "C1");
        assert_eq!(event.queue_name, "sales");
        assert_eq!(event.agent, None);
        assert_eq!(event.kind, EventKind::Enter);
        assert_eq!(log.stats.parsed_events, 1);
        assert_eq!(log.stats.skipped_lines, 0);
    }

    #[test]
    fn test_parse_complete_with_payload() {
        let log = parser().parse_log("1733280210|C1|sales|PJSIP/102|COMPLETEAGENT|12|198|1\n");

        assert_eq!(
            log.events[0].kind,
            EventKind::CompleteAgent {
                hold_secs: Some(12),
                talk_secs: Some(198),
            }
        );
        assert_eq!(log.events[0].agent, Some("102".to_string()));
    }

    #[test]
    fn test_garbled_payload_degrades_to_none() {
        let log = parser().parse_log("1733280210|C1|sales|PJSIP/102|COMPLETECALLER|x|y\n");

        assert_eq!(
            log.events[0].kind,
            EventKind::CompleteCaller {
                hold_secs: None,
                talk_secs: None,
            }
        );
    }

    #[test]
    fn test_malformed_line_counted_not_fatal() {
        let raw = "1733280000|C1|sales|NONE|ENTERQUEUE\n\
                   this line is garbage\n\
                   1733280060|C1|sales|PJSIP/102|CONNECT|60\n";
        let log = parser().parse_log(raw);

        assert_eq!(log.events.len(), 2);
        assert_eq!(log.stats.total_lines, 3);
        assert_eq!(log.stats.skipped_lines, 1);
    }

    #[test]
    fn test_unparseable_timestamp_is_skipped() {
        let log = parser().parse_log("yesterday|C1|sales|NONE|ENTERQUEUE\n");

        assert!(log.events.is_empty());
        assert_eq!(log.stats.skipped_lines, 1);
    }

    #[test]
    fn test_unrecognized_event_kind_quarantined() {
        let log = parser().parse_log("1733280000|C1|sales|NONE|QUEUESTART\n");

        assert_eq!(log.events[0].kind, EventKind::Unknown);
        assert_eq!(log.stats.skipped_lines, 0);
    }

    #[test]
    fn test_blank_lines_ignored() {
        let log = parser().parse_log("\n1733280000|C1|sales|NONE|ENTERQUEUE\n\n");

        assert_eq!(log.events.len(), 1);
        assert_eq!(log.stats.total_lines, 3);
        assert_eq!(log.stats.skipped_lines, 0);
    }

    #[test]
    fn test_agent_extension_variants() {
        let p = parser();
        let log = p.parse_log(
            "1733280000|C1|sales|pjsip/007|CONNECT|5\n\
             1733280001|C2|sales|Agent/333|CONNECT|5\n\
             1733280002|C3|sales|Local/llamadas|CONNECT|5\n",
        );

        assert_eq!(log.events[0].agent, Some("007".to_string()));
        assert_eq!(log.events[1].agent, Some("333".to_string()));
        assert_eq!(log.events[2].agent, None);
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let raw = "1733280000|C1|sales|NONE|ENTERQUEUE\n\
                   broken\n\
                   1733280060|C1|sales|PJSIP/102|CONNECT|60\n";
        let p = parser();

        let first = p.parse_log(raw);
        let second = p.parse_log(raw);

        assert_eq!(first.events, second.events);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_strptime_timestamps() {
        let p = EventParser::new(TimestampFormat::from_config("%Y-%m-%d %H:%M:%S"));
        let log = p.parse_log("2025-12-04 09:58:00|C1|sales|NONE|ENTERQUEUE\n");

        assert_eq!(log.events.len(), 1);
        assert_eq!(log.events[0].timestamp.to_string(), "2025-12-04 09:58:00");
    }
}
