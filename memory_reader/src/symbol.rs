use std::{
    fs::File,
    ops::Range,
    path::{Path, PathBuf},
};

use cpp_demangle::DemangleOptions;
use elf::{endian::AnyEndian, ElfStream};

use crate::{Error, MemoryMapRegion, Pointer};

/// A symbol from an ELF file, relocated to the address at which it is
/// mapped in the inspected process.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub location: Range<Pointer>,
}

struct FileSymbol {
    name: String,
    location: Range<usize>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, location: Range<Pointer>) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    pub fn contains(&self, ptr: Pointer) -> bool {
        self.location.contains(&ptr)
    }

    /// The demangled C++ name, e.g. `{vtable(FRPC::String_t)}` for
    /// `_ZTVN4FRPC8String_tE`.  Names that are not mangled are
    /// returned unchanged.
    pub fn demangled(&self) -> String {
        demangle(&self.name)
    }

    pub fn iter_symbols(
        region: &MemoryMapRegion,
    ) -> impl Iterator<Item = Symbol> {
        let region_address = region.mmap_start_address();
        region
            .name
            .clone()
            .into_iter()
            .map(|path| -> PathBuf { path.into() })
            .filter(|path| path.exists())
            .flat_map(|path| {
                FileSymbol::collect_symbols(&path)
                    .map_err(|err| {
                        log::debug!(
                            "Could not read symbols from {}: {err}",
                            path.display()
                        );
                        err
                    })
                    .into_iter()
            })
            .flatten()
            .map(move |file_symbol| {
                let FileSymbol { name, location } = file_symbol;
                let location = (region_address + location.start)
                    ..(region_address + location.end);
                Symbol { name, location }
            })
    }
}

pub fn demangle(name: &str) -> String {
    cpp_demangle::Symbol::new(name.as_bytes())
        .ok()
        .and_then(|symbol| symbol.demangle(&DemangleOptions::default()).ok())
        .unwrap_or_else(|| name.to_string())
}

impl FileSymbol {
    fn collect_symbols(path: impl AsRef<Path>) -> Result<Vec<Self>, Error> {
        // ElfStream caches internally, so `symbol_table` and
        // `dynamic_symbol_table` take a mutable reference, and the
        // tables cannot outlive this function.  The symbols are
        // collected into a vector before returning.
        let file_obj = File::open(path)?;
        let mut elf = ElfStream::<AnyEndian, _>::open_stream(&file_obj)?;

        let mut symbols = Vec::new();

        for i in 0..2 {
            let Some((table, names)) = if i == 0 {
                elf.symbol_table()
            } else {
                elf.dynamic_symbol_table()
            }?
            else {
                continue;
            };
            let symbol_iter = table
                .into_iter()
                .filter(|symbol| !symbol.is_undefined())
                .filter(|symbol| symbol.st_name > 0)
                .map(move |symbol| -> Result<_, Error> {
                    let name = names.get(symbol.st_name as usize)?.to_string();
                    let start = symbol.st_value as usize;
                    let len = symbol.st_size as usize;
                    let location = start..start + len;
                    Ok(FileSymbol { name, location })
                });

            for symbol in symbol_iter {
                symbols.push(symbol?);
            }
        }
        Ok(symbols)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn demangle_vtable() {
        assert_eq!(demangle("_ZTVN4FRPC8String_tE"), "{vtable(FRPC::String_t)}");
    }

    #[test]
    fn demangle_passes_through_plain_names() {
        assert_eq!(demangle("main"), "main");
    }

    #[test]
    fn symbol_contains_half_open() {
        let symbol = Symbol::new(
            "_ZTVN4FRPC8Struct_tE",
            Pointer::new(0x100usize)..Pointer::new(0x140usize),
        );
        assert!(symbol.contains(Pointer::new(0x100usize)));
        assert!(symbol.contains(Pointer::new(0x13fusize)));
        assert!(!symbol.contains(Pointer::new(0x140usize)));
    }
}
