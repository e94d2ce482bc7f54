mod client;
pub(crate) mod transform;

pub use client::{normalize_address, LokiClient, LokiConfig};
pub use transform::{group_streams_for_push, LokiPushRequest, LokiStream};
