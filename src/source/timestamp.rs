use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("failed to parse timestamp '{value}' with format '{format}': {source}")]
    ParseError {
        value: String,
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// How the first field of a queue_log line encodes time.
///
/// Asterisk writes epoch seconds; logs exported from a database dump carry
/// `%Y-%m-%d %H:%M:%S` style wall-clock strings instead.
#[derive(Debug, Clone)]
pub enum TimestampFormat {
    Epoch,
    Strptime(String),
}

impl TimestampFormat {
    /// Resolve a config string into a format.
    ///
    /// `"epoch"` selects epoch seconds; anything else is treated as a
    /// chrono strptime format string.
    pub fn from_config(format: &str) -> Self {
        match format {
            "epoch" => TimestampFormat::Epoch,
            other => TimestampFormat::Strptime(other.to_string()),
        }
    }

    /// Parse one timestamp field.
    ///
    /// Timestamps are naive: the log's wall clock is authoritative for
    /// date and hour bucketing, so no timezone conversion is applied.
    pub fn parse(&self, value: &str) -> Result<NaiveDateTime, TimestampError> {
        match self {
            TimestampFormat::Epoch => parse_epoch(value),
            TimestampFormat::Strptime(fmt) => parse_strptime(value, fmt),
        }
    }
}

fn parse_epoch(value: &str) -> Result<NaiveDateTime, TimestampError> {
    // Some writers append sub-second digits after a dot; second precision
    // is all the aggregation needs.
    let whole = value.split('.').next().unwrap_or(value);

    let seconds: i64 =
        whole
            .parse()
            .map_err(|e: std::num::ParseIntError| TimestampError::ParseError {
                value: value.to_string(),
                format: "epoch".to_string(),
                source: Box::new(e),
            })?;

    chrono::DateTime::from_timestamp(seconds, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| TimestampError::ParseError {
            value: value.to_string(),
            format: "epoch".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "timestamp out of range",
            )),
        })
}

fn parse_strptime(value: &str, format: &str) -> Result<NaiveDateTime, TimestampError> {
    NaiveDateTime::parse_from_str(value, format).map_err(|e| TimestampError::ParseError {
        value: value.to_string(),
        format: format.to_string(),
        source: Box::new(e),
    })
}
