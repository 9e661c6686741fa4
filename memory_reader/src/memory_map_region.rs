use std::fmt::Display;
use std::ops::Range;
use std::path::Path;

use crate::Symbol;

use super::{Error, Pointer, Result};

/// One line of `/proc/<pid>/maps`.
#[derive(Debug, Clone)]
pub struct MemoryMapRegion {
    pid: u32,
    start: Pointer,
    end: Pointer,
    file_offset: usize,
    pub name: Option<String>,
    pub is_executable: bool,
    pub is_readable: bool,
    pub is_writable: bool,
    pub is_shared_memory: bool,
}

impl MemoryMapRegion {
    pub fn new(map_range: proc_maps::MapRange, pid: u32) -> Result<Self> {
        let name = map_range
            .filename()
            .map(|p| {
                p.to_str()
                    .ok_or(Error::InvalidUTF8InPath)
                    .map(|s| s.to_string())
            })
            .transpose()?;
        Ok(Self {
            pid,
            start: map_range.start().into(),
            end: (map_range.start() + map_range.size()).into(),
            file_offset: map_range.offset,
            name,
            is_readable: map_range.is_read(),
            is_writable: map_range.is_write(),
            is_executable: map_range.is_exec(),
            is_shared_memory: map_range.flags.get(3..4) == Some("s"),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn short_name(&self) -> &str {
        self.name
            .as_deref()
            .map(|name| {
                Path::new(name)
                    .file_name()
                    .and_then(|file_name| file_name.to_str())
                    .unwrap_or(name)
            })
            .unwrap_or("[anon]")
    }

    pub fn size_bytes(&self) -> usize {
        self.end - self.start
    }

    pub fn mmap_start_address(&self) -> Pointer {
        self.start - self.file_offset
    }

    pub fn address_range(&self) -> Range<Pointer> {
        self.start..self.end
    }

    pub fn file_offset(&self) -> usize {
        self.file_offset
    }

    pub fn contains(&self, ptr: Pointer) -> bool {
        (self.start <= ptr) && (ptr < self.end)
    }

    pub fn matches_name(&self, search_name: &str) -> bool {
        self.name
            .as_ref()
            .map(|name| name == search_name)
            .unwrap_or(false)
    }

    /// Whether this region is a mapping of the given object file,
    /// named either by its full path or by its file name.
    pub fn is_backed_by(&self, objfile: &str) -> bool {
        self.matches_name(objfile)
            || (self.name.is_some() && self.short_name() == objfile)
    }

    pub fn flag_str(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.is_readable { 'r' } else { '-' },
            if self.is_writable { 'w' } else { '-' },
            if self.is_executable { 'x' } else { '-' },
            if self.is_shared_memory { 's' } else { 'p' },
        )
    }

    pub fn iter_symbols(&self) -> impl Iterator<Item = Symbol> {
        Symbol::iter_symbols(self)
    }
}

impl Display for MemoryMapRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.as_deref().unwrap_or("???");
        write!(
            f,
            "Region(PID {}, {} - {}, {}, \"{}\")",
            self.pid,
            self.start,
            self.end,
            self.flag_str(),
            name
        )
    }
}
