mod options;
mod sink;
mod tail;
mod view;

pub use options::{TailOptions, TailOptionsError};
pub use sink::{ConsoleSink, LogSink};
pub use tail::{LogByteStream, LogStreamSource, LogTailer};
pub use view::LogAggregationView;
