use crate::labels::LabelSet;
use crate::level::Level;
use crate::stream::{LogStream, PackedLogEntry};

/// Accumulates entries into streams between flushes.
///
/// The first `Level::ALL.len()` streams are the pre-created per-level streams,
/// indexed by `Level::index`. Entries with extra labels each get a dedicated
/// stream appended after them.
#[derive(Debug)]
pub struct StreamBatch {
    size: usize,
    predefined_labels: LabelSet,
    streams: Vec<LogStream>,
}

impl StreamBatch {
    pub fn new(predefined_labels: LabelSet) -> Self {
        let mut batch = Self {
            size: 0,
            predefined_labels,
            streams: Vec::new(),
        };
        batch.reset();
        batch
    }

    pub fn add(&mut self, packed: PackedLogEntry) {
        self.size += 1;

        if packed.labels.is_empty() {
            self.streams[packed.level.index()].entries.push(packed.entry);
            return;
        }

        let mut dedicated =
            LogStream::leveled(packed.level, [&self.predefined_labels, &packed.labels]);
        dedicated.entries.push(packed.entry);
        self.streams.push(dedicated);
    }

    pub fn reset(&mut self) {
        self.size = 0;
        self.streams = Level::ALL
            .iter()
            .map(|level| LogStream::leveled(*level, [&self.predefined_labels]))
            .collect();
    }

    pub fn streams(&self) -> &[LogStream] {
        &self.streams
    }

    pub fn count_entries(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}
