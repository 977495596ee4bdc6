pub mod extraction_plan;
pub mod manifest_writer;
pub mod report;

pub use extraction_plan::{ExtractionPlan, Group};
pub use manifest_writer::ManifestWriter;
pub use report::{ExtractionReport, RangeSummary};
