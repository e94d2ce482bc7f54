use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::labels::{merge_labels, LabelSet, LOG_LEVEL_LABEL};
use crate::level::Level;

/// A single log record, captured when the producer called the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: SystemTime,
    pub format: String,
    pub args: Vec<String>,
}

impl LogEntry {
    pub fn new(format: impl Into<String>, args: &[&dyn fmt::Display]) -> Self {
        Self {
            timestamp: SystemTime::now(),
            format: format.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Nanoseconds since the UNIX epoch. Clocks before the epoch yield 0.
    pub fn timestamp_ns(&self) -> u128 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    }

    /// Fill `{}` placeholders with the arguments, left to right.
    ///
    /// `{{` and `}}` produce literal braces. A placeholder without a matching
    /// argument is kept as is; surplus arguments are appended after a space.
    pub fn message(&self) -> String {
        let mut out = String::with_capacity(self.format.len());
        let mut args = self.args.iter();
        let mut chars = self.format.chars().peekable();

        while let Some(c) = chars.next() {
            match (c, chars.peek()) {
                ('{', Some('{')) => {
                    chars.next();
                    out.push('{');
                }
                ('}', Some('}')) => {
                    chars.next();
                    out.push('}');
                }
                ('{', Some('}')) => {
                    chars.next();
                    match args.next() {
                        Some(arg) => out.push_str(arg),
                        None => out.push_str("{}"),
                    }
                }
                _ => out.push(c),
            }
        }

        for extra in args {
            out.push(' ');
            out.push_str(extra);
        }

        out
    }
}

/// Entries sharing one label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStream {
    pub level: Level,
    pub labels: LabelSet,
    pub entries: Vec<LogEntry>,
}

impl LogStream {
    /// Empty stream for `level`. Label sets are merged in order, then the
    /// level label is forced on top.
    pub fn leveled<'a, I>(level: Level, label_sets: I) -> Self
    where
        I: IntoIterator<Item = &'a LabelSet>,
    {
        let forced = LabelSet::from([(LOG_LEVEL_LABEL.to_string(), level.as_str().to_string())]);
        let mut labels = merge_labels(label_sets);
        labels.extend(forced);

        Self {
            level,
            labels,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Producer to exchange loop handoff record.
#[derive(Debug, Clone)]
pub struct PackedLogEntry {
    pub level: Level,
    pub labels: LabelSet,
    pub entry: LogEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(format: &str, args: &[&str]) -> LogEntry {
        LogEntry {
            timestamp: UNIX_EPOCH,
            format: format.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_message_fills_placeholders() {
        let e = entry("user {} logged in from {}", &["alice", "10.0.0.1"]);
        assert_eq!(e.message(), "user alice logged in from 10.0.0.1");
    }

    #[test]
    fn test_message_escapes_and_missing_args() {
        assert_eq!(entry("{{literal}} {}", &["x"]).message(), "{literal} x");
        assert_eq!(entry("a={} b={}", &["1"]).message(), "a=1 b={}");
        assert_eq!(entry("plain", &["extra", "args"]).message(), "plain extra args");
    }

    #[test]
    fn test_new_renders_display_args() {
        let e = LogEntry::new("took {}ms", &[&42u64]);
        assert_eq!(e.args, vec!["42".to_string()]);
        assert_eq!(e.message(), "took 42ms");
    }

    #[test]
    fn test_timestamp_ns() {
        let mut e = entry("x", &[]);
        e.timestamp = UNIX_EPOCH + Duration::new(1, 5);
        assert_eq!(e.timestamp_ns(), 1_000_000_005);
    }

    #[test]
    fn test_leveled_stream_forces_level_label() {
        let predefined = LabelSet::from([
            ("app".to_string(), "billing".to_string()),
            (LOG_LEVEL_LABEL.to_string(), "bogus".to_string()),
        ]);
        let extra = LabelSet::from([(LOG_LEVEL_LABEL.to_string(), "DEBUG".to_string())]);

        let stream = LogStream::leveled(Level::Error, [&predefined, &extra]);

        assert_eq!(stream.labels[LOG_LEVEL_LABEL], "ERROR");
        assert_eq!(stream.labels["app"], "billing");
        assert!(stream.is_empty());
    }
}
