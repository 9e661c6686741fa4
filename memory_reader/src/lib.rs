mod memory_reader;
pub use memory_reader::MemoryReader;

mod error;
pub use error::{Error, Result};

mod memory_map_region;
pub use memory_map_region::*;

mod pointer;
pub use pointer::*;

mod byte_range;
pub use byte_range::*;

mod owned_bytes;
pub use owned_bytes::*;

mod symbol;
pub use symbol::*;
