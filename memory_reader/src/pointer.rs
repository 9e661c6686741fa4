use std::fmt::{Debug, Display};

use crate::Error;

/// An address in the inspected process.  Never dereferenced locally;
/// all reads go through a `MemoryReader` or another reader of the
/// remote address space.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pointer {
    pub(crate) address: usize,
}

impl Pointer {
    pub const SIZE: usize = std::mem::size_of::<usize>();

    #[inline]
    pub fn new(address: impl Into<Self>) -> Self {
        address.into()
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.address
    }

    #[inline]
    pub fn as_non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    #[inline]
    pub fn null() -> Self {
        Self { address: 0 }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    #[inline]
    pub fn is_aligned(&self, alignment: usize) -> bool {
        self.address % alignment == 0
    }

    /// Offset the pointer, returning an error rather than wrapping
    /// around.  Addresses read out of a corrupted structure are
    /// arbitrary, so field offsets applied to them must be checked.
    #[inline]
    pub fn try_add(self, offset: usize) -> Result<Self, Error> {
        self.checked_add(offset)
            .ok_or(Error::PointerOverflow(self, offset))
    }

    #[inline]
    pub fn checked_add(self, offset: usize) -> Option<Self> {
        self.address
            .checked_add(offset)
            .map(|address| Self { address })
    }

    #[inline]
    pub fn checked_sub(self, offset: usize) -> Option<Self> {
        self.address
            .checked_sub(offset)
            .map(|address| Self { address })
    }

    /// Number of bytes from `other` up to `self`, if `self` is not
    /// before `other`.
    #[inline]
    pub fn checked_offset_from(self, other: Pointer) -> Option<usize> {
        self.address.checked_sub(other.address)
    }
}

impl std::ops::Add<usize> for Pointer {
    type Output = Pointer;

    #[inline]
    fn add(self, rhs: usize) -> Self::Output {
        Self {
            address: self.address.wrapping_add(rhs),
        }
    }
}

impl std::ops::Sub<usize> for Pointer {
    type Output = Pointer;

    #[inline]
    fn sub(self, rhs: usize) -> Self::Output {
        Self {
            address: self.address.wrapping_sub(rhs),
        }
    }
}

impl std::ops::Sub for Pointer {
    type Output = usize;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.address.wrapping_sub(rhs.address)
    }
}

impl Debug for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pointer(0x{:016x})", self.address)
    }
}

/// Formats the same way gdb prints a pointer value, without zero
/// padding.
impl Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.address)
    }
}

impl From<usize> for Pointer {
    #[inline]
    fn from(address: usize) -> Self {
        Self { address }
    }
}

impl From<Pointer> for usize {
    #[inline]
    fn from(ptr: Pointer) -> Self {
        ptr.address
    }
}

impl From<[u8; 8]> for Pointer {
    #[inline]
    fn from(bytes: [u8; 8]) -> Self {
        let address = usize::from_ne_bytes(bytes);
        Self { address }
    }
}

impl TryFrom<&[u8]> for Pointer {
    type Error = std::array::TryFromSliceError;

    #[inline]
    fn try_from(bytes: &[u8]) -> std::result::Result<Self, Self::Error> {
        let address = usize::from_ne_bytes(bytes.try_into()?);
        Ok(Self { address })
    }
}
