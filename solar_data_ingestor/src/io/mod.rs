pub mod reader;
pub mod sink;

pub use reader::{read_blocks, read_table};
pub use sink::{CsvDirSink, SinkError, TableSink};
