use std::ops::Range;

use crate::{Error, Pointer};

/// A view into bytes that were read out of the inspected process,
/// remembering the remote address they were read from.
#[derive(Clone, Copy)]
pub struct ByteRange<'a> {
    pub(crate) start: Pointer,
    pub(crate) bytes: &'a [u8],
}

/// Fixed-size values that can be decoded from remote bytes.
pub trait UnpackBytes: Sized {
    const SIZE: usize;

    fn unpack(bytes: ByteRange) -> Result<Self, Error>;
}

impl<'a> ByteRange<'a> {
    pub fn new(start: Pointer, bytes: &'a [u8]) -> Self {
        Self { start, bytes }
    }

    pub fn ptr_range(&self) -> Range<Pointer> {
        self.start..self.end()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn start(&self) -> Pointer {
        self.start
    }

    pub fn end(&self) -> Pointer {
        self.start + self.bytes.len()
    }

    pub fn unpack<T: UnpackBytes>(&self) -> Result<T, Error> {
        T::unpack(*self)
    }

    /// Unpack a value of type `T` located `offset` bytes into the
    /// range.
    pub fn unpack_at<T: UnpackBytes>(&self, offset: usize) -> Result<T, Error> {
        self.subrange(offset..offset + T::SIZE)?.unpack()
    }

    pub fn subrange(&self, range: Range<usize>) -> Result<Self, Error> {
        self.bytes
            .get(range.clone())
            .map(|bytes| Self {
                start: self.start + range.start,
                bytes,
            })
            .ok_or(Error::InsufficientBytes {
                start: self.start + range.start,
                expected: range.end.saturating_sub(range.start),
                provided: self.bytes.len().saturating_sub(range.start),
            })
    }

    fn exact<const N: usize>(&self) -> Result<[u8; N], Error> {
        self.bytes.try_into().map_err(|_| Error::InsufficientBytes {
            start: self.start,
            expected: N,
            provided: self.bytes.len(),
        })
    }
}

impl<'a> From<ByteRange<'a>> for Range<Pointer> {
    fn from(val: ByteRange<'a>) -> Self {
        val.ptr_range()
    }
}

macro_rules! from_bytes_prim {
    ($prim:ident) => {
        impl UnpackBytes for $prim {
            const SIZE: usize = std::mem::size_of::<$prim>();

            fn unpack(bytes: ByteRange) -> Result<Self, Error> {
                Ok($prim::from_le_bytes(bytes.exact()?))
            }
        }
    };
}

from_bytes_prim! {u8}
from_bytes_prim! {u16}
from_bytes_prim! {u32}
from_bytes_prim! {u64}
from_bytes_prim! {i8}
from_bytes_prim! {i16}
from_bytes_prim! {i32}
from_bytes_prim! {i64}
from_bytes_prim! {f64}
from_bytes_prim! {usize}

impl UnpackBytes for bool {
    const SIZE: usize = 1;

    fn unpack(bytes: ByteRange) -> Result<Self, Error> {
        let byte: u8 = bytes.unpack()?;
        Ok(byte > 0)
    }
}

impl UnpackBytes for Pointer {
    const SIZE: usize = Pointer::SIZE;

    fn unpack(bytes: ByteRange) -> Result<Self, Error> {
        let address: usize = bytes.unpack()?;
        Ok(address.into())
    }
}
