use std::cell::OnceCell;
use std::ops::Range;

use itertools::Itertools as _;
use memory_reader::{MemoryReader, Pointer, Symbol};

use crate::Inspect;

/// `Inspect` adapter over a live process.
pub struct ProcessInspector {
    reader: MemoryReader,
    symbols: OnceCell<Vec<Symbol>>,
}

impl ProcessInspector {
    pub fn new(reader: MemoryReader) -> Self {
        Self {
            reader,
            symbols: OnceCell::new(),
        }
    }

    pub fn attach(pid: u32) -> Result<Self, memory_reader::Error> {
        Ok(Self::new(MemoryReader::new(pid)?))
    }

    pub fn reader(&self) -> &MemoryReader {
        &self.reader
    }

    /// Symbol tables of the mapped files do not change while the
    /// process runs, so they are loaded once, on first use.
    fn symbols(&self) -> &[Symbol] {
        self.symbols.get_or_init(|| {
            let symbols: Vec<_> = self
                .reader
                .iter_symbols()
                .filter(|symbol| !symbol.location.is_empty())
                .sorted_by_key(|symbol| symbol.location.start)
                .collect();
            log::debug!(
                "Loaded {} symbols for process {}",
                symbols.len(),
                self.reader.pid()
            );
            symbols
        })
    }
}

/// Find the symbol containing `ptr` in a list sorted by start
/// address.
pub(crate) fn find_symbol(symbols: &[Symbol], ptr: Pointer) -> Option<&Symbol> {
    let index = symbols.partition_point(|symbol| symbol.location.start <= ptr);
    symbols[..index]
        .iter()
        .rev()
        .take_while(|symbol| within_reach(&symbol.location, ptr))
        .find(|symbol| symbol.contains(ptr))
}

// Symbols may overlap (aliases, nested objects), so the search looks
// back past the immediately preceding symbol, but only while the
// candidates could still reach `ptr`.
fn within_reach(location: &Range<Pointer>, ptr: Pointer) -> bool {
    const MAX_SYMBOL_SIZE: usize = 1 << 20;
    ptr.checked_offset_from(location.start)
        .map(|offset| offset < MAX_SYMBOL_SIZE)
        .unwrap_or(false)
}

impl Inspect for ProcessInspector {
    fn read_exact(
        &self,
        ptr: Pointer,
        buffer: &mut [u8],
    ) -> Result<(), memory_reader::Error> {
        self.reader.read_exact(ptr, buffer)
    }

    fn symbol_at(&self, ptr: Pointer) -> Option<String> {
        find_symbol(self.symbols(), ptr).map(|symbol| symbol.demangled())
    }

    fn objfile_of(&self, ptr: Pointer) -> Option<String> {
        self.reader
            .find_containing_region(ptr)
            .and_then(|region| region.name().map(|name| name.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn symbol(name: &str, start: usize, end: usize) -> Symbol {
        Symbol::new(name, Pointer::new(start)..Pointer::new(end))
    }

    #[test]
    fn find_symbol_in_sorted_list() {
        let symbols = vec![
            symbol("a", 0x100, 0x110),
            symbol("b", 0x110, 0x180),
            symbol("c", 0x200, 0x210),
        ];
        let found = |addr: usize| {
            find_symbol(&symbols, Pointer::new(addr)).map(|s| s.name.as_str())
        };
        assert_eq!(found(0x100), Some("a"));
        assert_eq!(found(0x120), Some("b"));
        assert_eq!(found(0x190), None);
        assert_eq!(found(0x20f), Some("c"));
        assert_eq!(found(0x50), None);
    }

    #[test]
    fn find_symbol_with_overlap() {
        let symbols = vec![
            symbol("outer", 0x100, 0x200),
            symbol("inner", 0x120, 0x130),
        ];
        let found = find_symbol(&symbols, Pointer::new(0x150usize));
        assert_eq!(found.map(|s| s.name.as_str()), Some("outer"));
    }
}
