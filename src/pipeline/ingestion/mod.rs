// Pipeline ingestion: turning an uploaded object into an untyped table

pub mod table;

pub use table::{load_table, read_csv, read_spreadsheet, RawTable, UploadFormat};
