pub mod workbook;

pub use workbook::{render_fulfillment_report, render_sample_report, sheet_names, SampleReport};
