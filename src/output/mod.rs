//! Output formatting module
//!
//! Renders round reports, run summaries and task listings.

mod formatter;

pub use formatter::{write_summary_to_file, OutputFormat, ResultFormatter};
