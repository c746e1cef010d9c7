pub mod sink;
pub mod summary;

pub use sink::{read_snapshots, FileSink, SinkError, SnapshotLog, SnapshotSink};
pub use summary::{pair_labels, summarize, PairStats};
