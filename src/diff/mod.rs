pub mod aggregator;
pub mod quoting;

pub use aggregator::{ChangedPath, DiffAggregator};
pub use quoting::{needs_quoting, quote_path, unquote_path};
