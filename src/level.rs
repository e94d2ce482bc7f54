use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
    Panic = 5,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(String);

impl Level {
    /// All levels in declaration order.
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Panic => "PANIC",
        }
    }

    pub fn from_u8(raw: u8) -> Option<Level> {
        Level::ALL.get(raw as usize).copied()
    }

    /// Name for a raw level value, `"unknown"` when out of range.
    pub fn name_of(raw: u8) -> &'static str {
        Level::from_u8(raw).map_or("unknown", |level| level.as_str())
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names() {
        let names: Vec<&str> = Level::ALL.iter().map(Level::as_str).collect();
        assert_eq!(names, ["DEBUG", "INFO", "WARN", "ERROR", "FATAL", "PANIC"]);
        assert_eq!(Level::Warn.to_string(), "WARN");
    }

    #[test]
    fn test_declaration_order() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Fatal < Level::Panic);
        assert_eq!(Level::from_u8(3), Some(Level::Error));
    }

    #[test]
    fn test_unknown_raw_value() {
        assert_eq!(Level::from_u8(6), None);
        assert_eq!(Level::name_of(42), "unknown");
        assert_eq!(Level::name_of(0), "DEBUG");
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("info".parse::<Level>(), Ok(Level::Info));
        assert_eq!(" Panic ".parse::<Level>(), Ok(Level::Panic));
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_parse_error_names_input() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert_eq!(err.to_string(), "unknown log level: verbose");
    }
}
