// Observability: metrics recording for the upload pipeline

pub mod metrics;

pub use metrics::{init, render};
