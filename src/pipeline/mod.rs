pub mod batch;
pub mod exchanger;

pub use batch::StreamBatch;
pub use exchanger::{default_error_callback, ErrorCallback, Exchanger, ExchangerConfig};
