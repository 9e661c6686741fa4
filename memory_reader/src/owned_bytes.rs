use std::ops::{Deref, Range};

use crate::{ByteRange, Error, Pointer, UnpackBytes};

/// Bytes copied out of the inspected process.  Holding an
/// `OwnedBytes` does not keep the remote memory alive; it is a
/// snapshot at the time of the read.
#[derive(Clone)]
pub struct OwnedBytes {
    start: Pointer,
    bytes: Vec<u8>,
}

impl OwnedBytes {
    pub fn new(start: Pointer, bytes: Vec<u8>) -> Self {
        Self { start, bytes }
    }

    pub fn ptr_range(&self) -> Range<Pointer> {
        self.start..self.start + self.bytes.len()
    }

    pub fn as_range(&self) -> ByteRange<'_> {
        self.into()
    }

    pub fn subrange(&self, range: Range<usize>) -> Result<ByteRange<'_>, Error> {
        self.as_range().subrange(range)
    }

    pub fn unpack_at<T: UnpackBytes>(&self, offset: usize) -> Result<T, Error> {
        self.as_range().unpack_at(offset)
    }

    pub fn start(&self) -> Pointer {
        self.start
    }

    pub fn end(&self) -> Pointer {
        self.start + self.bytes.len()
    }

    pub fn take(self) -> Vec<u8> {
        self.bytes
    }
}

impl<'a> From<&'a OwnedBytes> for ByteRange<'a> {
    fn from(val: &'a OwnedBytes) -> Self {
        ByteRange::new(val.start, &val.bytes)
    }
}

impl Deref for OwnedBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}
