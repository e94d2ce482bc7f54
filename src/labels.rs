use std::collections::BTreeMap;

/// Label set attached to a stream. Ordered so the pushed JSON is deterministic.
pub type LabelSet = BTreeMap<String, String>;

/// Label forced into every stream, always carrying the stream's level name.
pub const LOG_LEVEL_LABEL: &str = "logLevel";

pub fn copy_labels(src: &LabelSet) -> LabelSet {
    src.clone()
}

/// Merge label sets left to right. Later sets overwrite earlier ones on key collision.
pub fn merge_labels<'a, I>(sources: I) -> LabelSet
where
    I: IntoIterator<Item = &'a LabelSet>,
{
    let mut merged = LabelSet::new();
    for source in sources {
        for (key, value) in source {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}
