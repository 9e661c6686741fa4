use std::io::IoSliceMut;
use std::ops::Range;

use itertools::Itertools;
use nix::errno::Errno;
use nix::sys::uio::{process_vm_readv, RemoteIoVec};
use nix::unistd::Pid;

use crate::{Error, MemoryMapRegion, OwnedBytes, Pointer, Result, Symbol};

/// Reads the memory of another process on the same host.
///
/// The list of memory regions is captured when the reader is
/// constructed.  The contents of memory are never cached, as the
/// inspected process may continue running between reads.
pub struct MemoryReader {
    pid: u32,
    regions: Vec<MemoryMapRegion>,
    region_ranges: Vec<(Range<Pointer>, usize)>,
}

impl MemoryReader {
    pub fn new(pid: u32) -> Result<Self> {
        let regions = Self::get_memory_regions(pid)?;

        let region_ranges = regions
            .iter()
            .enumerate()
            .map(|(i, region)| (region.address_range(), i))
            .sorted_by_key(|(range, _)| range.start)
            .collect();

        Ok(Self {
            pid,
            regions,
            region_ranges,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn iter_regions(&self) -> impl Iterator<Item = &MemoryMapRegion> + '_ {
        self.regions.iter()
    }

    fn get_memory_regions(pid: u32) -> Result<Vec<MemoryMapRegion>> {
        let raw_pid: proc_maps::Pid = pid
            .try_into()
            .map_err(|_| Error::ProcessNotFound(pid))?;
        proc_maps::get_process_maps(raw_pid)
            .map_err(|_| Error::MemoryMapNotFound(pid))?
            .into_iter()
            .map(|map_range| MemoryMapRegion::new(map_range, pid))
            .collect()
    }

    pub fn read_exact(
        &self,
        ptr: impl Into<Pointer>,
        buffer: &mut [u8],
    ) -> Result<()> {
        let ptr: Pointer = ptr.into();

        if ptr.is_null() {
            return Err(Error::MemoryReadNullPointer);
        }
        if buffer.is_empty() {
            return Ok(());
        }

        let len = buffer.len();
        let remote = [RemoteIoVec {
            base: ptr.as_usize(),
            len,
        }];
        let mut local = [IoSliceMut::new(buffer)];

        let num_read =
            process_vm_readv(Pid::from_raw(self.pid as i32), &mut local, &remote)
                .map_err(|err| match err {
                    Errno::EPERM => Error::MemoryReadInsufficientPermission,
                    Errno::EFAULT => Error::MemoryReadBadAddress(ptr, len),
                    Errno::ESRCH => Error::ProcessNotFound(self.pid),
                    err => Error::MemoryReadOther { err },
                })?;

        // A partial read happens when the requested range crosses into
        // an unmapped page.
        if num_read < len {
            return Err(Error::MemoryReadBadAddress(ptr + num_read, len));
        }

        Ok(())
    }

    pub fn read_byte_array<const N: usize>(
        &self,
        pointer: impl Into<Pointer>,
    ) -> Result<[u8; N]> {
        let mut buffer = [0u8; N];
        self.read_exact(pointer, &mut buffer)?;
        Ok(buffer)
    }

    pub fn read_bytes(&self, range: Range<Pointer>) -> Result<OwnedBytes> {
        let size = range
            .end
            .checked_offset_from(range.start)
            .ok_or(Error::MemoryReadBadAddress(range.start, 0))?;
        let mut buffer = vec![0u8; size];
        self.read_exact(range.start, &mut buffer)?;
        Ok(OwnedBytes::new(range.start, buffer))
    }

    pub fn find_region(
        &self,
        mut filter: impl FnMut(&MemoryMapRegion) -> bool,
    ) -> Option<&MemoryMapRegion> {
        self.iter_regions().find(|reg| filter(reg))
    }

    pub fn is_valid_ptr(&self, ptr: Pointer) -> bool {
        self.find_containing_region(ptr).is_some()
    }

    pub fn find_containing_region(
        &self,
        ptr: Pointer,
    ) -> Option<&MemoryMapRegion> {
        if ptr.is_null() {
            return None;
        }

        match self
            .region_ranges
            .binary_search_by_key(&ptr, |(range, _)| range.start)
        {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
        .map(|i| &self.region_ranges[i])
        .filter(|(range, _)| range.contains(&ptr))
        .map(|(_, index)| &self.regions[*index])
    }

    /// Symbols from every file-backed region, relocated to the
    /// addresses at which they are mapped in the inspected process.
    pub fn iter_symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.iter_regions()
            .filter(|region| region.file_offset() == 0)
            .unique_by(|region| region.name.clone())
            .flat_map(|region| region.iter_symbols())
    }
}
