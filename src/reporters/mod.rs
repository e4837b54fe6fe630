pub mod writer;

pub use writer::{FileReportSink, ReportSink};
