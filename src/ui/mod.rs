pub mod printer;
pub mod progress;

pub use progress::{ConsoleSink, ProgressReporter, ProgressSink};
