use std::ops::Range;

use memory_reader::{ByteRange, OwnedBytes, Pointer, UnpackBytes};

/// A value in the inspected process: where it lives, and the type
/// name the debugger reports for it.
///
/// A `ValueRef` does not own or pin the memory it describes.  The
/// inspected process may run between two debugger commands, so every
/// formatter operation reads the memory again.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValueRef {
    pub location: Pointer,
    pub type_name: String,
}

impl ValueRef {
    pub fn new(location: impl Into<Pointer>, type_name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            type_name: type_name.into(),
        }
    }

    /// The same memory, viewed as a different type.
    pub fn cast(&self, type_name: impl Into<String>) -> Self {
        Self {
            location: self.location,
            type_name: type_name.into(),
        }
    }
}

impl std::fmt::Display for ValueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} *) {}", self.type_name, self.location)
    }
}

/// The introspection capabilities a formatter needs from the host
/// debugger.  Each host provides a thin adapter implementing this
/// trait, so that the formatters themselves never depend on a
/// particular debugger.
pub trait Inspect {
    /// Fill `buffer` with the bytes starting at `ptr`.
    fn read_exact(
        &self,
        ptr: Pointer,
        buffer: &mut [u8],
    ) -> Result<(), memory_reader::Error>;

    /// Demangled name of the symbol whose extent contains `ptr`.
    fn symbol_at(&self, _ptr: Pointer) -> Option<String> {
        None
    }

    /// Name of the object file whose mapping contains `ptr`.
    fn objfile_of(&self, _ptr: Pointer) -> Option<String> {
        None
    }

    /// The target of a typedef, one level deep.  Returns `None` if
    /// `name` is not a typedef.
    fn resolve_typedef(&self, _name: &str) -> Option<String> {
        None
    }
}

// Typed readers.  Provided on the trait object rather than as default
// methods, so that they remain callable through `&dyn Inspect`.
impl dyn Inspect + '_ {
    pub fn read_bytes(
        &self,
        range: Range<Pointer>,
    ) -> Result<OwnedBytes, memory_reader::Error> {
        let size = range
            .end
            .checked_offset_from(range.start)
            .ok_or(memory_reader::Error::MemoryReadBadAddress(range.start, 0))?;
        let mut buffer = vec![0u8; size];
        self.read_exact(range.start, &mut buffer)?;
        Ok(OwnedBytes::new(range.start, buffer))
    }

    pub fn read_value<T: UnpackBytes>(
        &self,
        ptr: Pointer,
    ) -> Result<T, memory_reader::Error> {
        let mut buffer = [0u8; 16];
        let buffer = &mut buffer[..T::SIZE];
        self.read_exact(ptr, buffer)?;
        ByteRange::new(ptr, buffer).unpack()
    }

    pub fn read_pointer(&self, ptr: Pointer) -> Result<Pointer, memory_reader::Error> {
        self.read_value(ptr)
    }

    pub fn read_u8(&self, ptr: Pointer) -> Result<u8, memory_reader::Error> {
        self.read_value(ptr)
    }

    pub fn read_i8(&self, ptr: Pointer) -> Result<i8, memory_reader::Error> {
        self.read_value(ptr)
    }

    pub fn read_i16(&self, ptr: Pointer) -> Result<i16, memory_reader::Error> {
        self.read_value(ptr)
    }

    pub fn read_i32(&self, ptr: Pointer) -> Result<i32, memory_reader::Error> {
        self.read_value(ptr)
    }

    pub fn read_i64(&self, ptr: Pointer) -> Result<i64, memory_reader::Error> {
        self.read_value(ptr)
    }

    pub fn read_u64(&self, ptr: Pointer) -> Result<u64, memory_reader::Error> {
        self.read_value(ptr)
    }

    pub fn read_usize(&self, ptr: Pointer) -> Result<usize, memory_reader::Error> {
        self.read_value(ptr)
    }

    pub fn read_f64(&self, ptr: Pointer) -> Result<f64, memory_reader::Error> {
        self.read_value(ptr)
    }
}
