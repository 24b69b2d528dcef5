pub mod byte_reader;
pub mod byte_writer;

pub use byte_reader::ByteReader;
pub use byte_writer::ByteWriter;
