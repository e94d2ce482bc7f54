use std::collections::HashMap;

use serde::Serialize;

use crate::labels::LabelSet;
use crate::level::Level;
use crate::stream::{LogEntry, LogStream};

/// Loki Push API request format.
/// POST /loki/api/v1/push
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LokiPushRequest {
    pub streams: Vec<LokiStream>,
}

/// A stream of log entries sharing the same label set.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LokiStream {
    pub stream: LabelSet,
    pub values: Vec<[String; 2]>,
}

/// Log line as stored in Loki: level name, then the rendered message.
pub fn format_line(level: Level, entry: &LogEntry) -> String {
    format!("{}: {}", level, entry.message())
}

/// Build the push request for a batch.
///
/// Empty streams are skipped. Streams whose label sets are equal are written
/// as one Loki stream, in the order their label set first appeared, with the
/// merged values sorted by timestamp.
pub fn group_streams_for_push(streams: &[LogStream]) -> LokiPushRequest {
    let mut positions: HashMap<&LabelSet, usize> = HashMap::new();
    let mut grouped: Vec<(&LabelSet, Vec<(u128, String)>)> = Vec::new();

    for stream in streams.iter().filter(|s| !s.is_empty()) {
        let position = *positions.entry(&stream.labels).or_insert_with(|| {
            grouped.push((&stream.labels, Vec::with_capacity(stream.entries.len())));
            grouped.len() - 1
        });

        grouped[position].1.extend(
            stream
                .entries
                .iter()
                .map(|entry| (entry.timestamp_ns(), format_line(stream.level, entry))),
        );
    }

    let streams = grouped
        .into_iter()
        .map(|(labels, mut values)| {
            values.sort_by_key(|(ts, _)| *ts);
            LokiStream {
                stream: labels.clone(),
                values: values
                    .into_iter()
                    .map(|(ts, line)| [ts.to_string(), line])
                    .collect(),
            }
        })
        .collect();

    LokiPushRequest { streams }
}
