mod processor;
mod reader;
mod writer;

pub use processor::CustomerProcessor;
pub use reader::CustomerReader;
pub use writer::CustomerWriter;
