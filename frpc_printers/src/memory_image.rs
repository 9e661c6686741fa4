use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use memory_reader::{Pointer, Symbol};

use crate::process_inspector::find_symbol;
use crate::Inspect;

/// Captured memory of a process, with enough symbol and type
/// information to run the formatters offline.
///
/// Regions that were not captured read as inaccessible, the same as
/// unmapped memory in a live process.
#[derive(Default, Clone)]
pub struct MemoryImage {
    segments: BTreeMap<Pointer, Segment>,
    symbols: Vec<Symbol>,
    typedefs: HashMap<String, String>,
}

#[derive(Clone)]
struct Segment {
    bytes: Vec<u8>,
    objfile: Option<String>,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(
        &mut self,
        start: Pointer,
        bytes: Vec<u8>,
        objfile: Option<&str>,
    ) -> &mut Self {
        let objfile = objfile.map(|name| name.to_string());
        self.segments.insert(start, Segment { bytes, objfile });
        self
    }

    pub fn add_symbol(
        &mut self,
        name: impl Into<String>,
        location: Range<Pointer>,
    ) -> &mut Self {
        let symbol = Symbol::new(name, location);
        let index = self
            .symbols
            .partition_point(|other| other.location.start <= symbol.location.start);
        self.symbols.insert(index, symbol);
        self
    }

    pub fn add_typedef(
        &mut self,
        alias: impl Into<String>,
        target: impl Into<String>,
    ) -> &mut Self {
        self.typedefs.insert(alias.into(), target.into());
        self
    }

    /// Overwrite captured memory.  The written range must lie within
    /// a single captured segment.
    pub fn write(
        &mut self,
        ptr: Pointer,
        bytes: &[u8],
    ) -> Result<(), memory_reader::Error> {
        let (offset, segment) = self.segment_mut(ptr, bytes.len())?;
        segment.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn locate(&self, ptr: Pointer) -> Option<(Pointer, &Segment)> {
        self.segments
            .range(..=ptr)
            .next_back()
            .map(|(start, segment)| (*start, segment))
    }

    fn segment_offset(
        start: Pointer,
        segment_len: usize,
        ptr: Pointer,
        len: usize,
    ) -> Option<usize> {
        let offset = ptr.checked_offset_from(start)?;
        let end = offset.checked_add(len)?;
        (end <= segment_len).then_some(offset)
    }

    fn segment_mut(
        &mut self,
        ptr: Pointer,
        len: usize,
    ) -> Result<(usize, &mut Segment), memory_reader::Error> {
        if ptr.is_null() {
            return Err(memory_reader::Error::MemoryReadNullPointer);
        }
        self.segments
            .range_mut(..=ptr)
            .next_back()
            .and_then(|(start, segment)| {
                Self::segment_offset(*start, segment.bytes.len(), ptr, len)
                    .map(|offset| (offset, segment))
            })
            .ok_or(memory_reader::Error::MemoryReadBadAddress(ptr, len))
    }
}

impl Inspect for MemoryImage {
    fn read_exact(
        &self,
        ptr: Pointer,
        buffer: &mut [u8],
    ) -> Result<(), memory_reader::Error> {
        if ptr.is_null() {
            return Err(memory_reader::Error::MemoryReadNullPointer);
        }
        let len = buffer.len();
        let (offset, segment) = self
            .locate(ptr)
            .and_then(|(start, segment)| {
                Self::segment_offset(start, segment.bytes.len(), ptr, len)
                    .map(|offset| (offset, segment))
            })
            .ok_or(memory_reader::Error::MemoryReadBadAddress(ptr, len))?;
        buffer.copy_from_slice(&segment.bytes[offset..offset + len]);
        Ok(())
    }

    fn symbol_at(&self, ptr: Pointer) -> Option<String> {
        find_symbol(&self.symbols, ptr).map(|symbol| symbol.demangled())
    }

    fn objfile_of(&self, ptr: Pointer) -> Option<String> {
        self.locate(ptr)
            .filter(|(start, segment)| {
                Self::segment_offset(*start, segment.bytes.len(), ptr, 1).is_some()
            })
            .and_then(|(_, segment)| segment.objfile.clone())
    }

    fn resolve_typedef(&self, name: &str) -> Option<String> {
        self.typedefs.get(name).cloned()
    }
}
