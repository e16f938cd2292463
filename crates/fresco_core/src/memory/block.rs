use super::raw::RawBlock;
use super::{Access, MemoryError};
use bytemuck::Pod;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

/// A fixed-size block of page-aligned memory accessed as elements of `T`.
///
/// The element count is always `size / size_of::<T>()`; a byte tail shorter
/// than one element is never addressable. The address stays valid until
/// [`release`](Self::release) or drop, whichever comes first.
pub struct MemoryBlock<T> {
    raw: RawBlock,
    access: Access,
    _marker: PhantomData<T>,
}

impl<T: Pod> MemoryBlock<T> {
    const ELEMENT_SIZE: usize = size_of::<T>();

    /// Allocate a zeroed read-write block of `size` bytes.
    pub fn new(size: usize) -> Result<Self, MemoryError> {
        Self::with_access(size, Access::ReadWrite)
    }

    /// Allocate a zeroed block of `size` bytes with the given access mode.
    pub fn with_access(size: usize, access: Access) -> Result<Self, MemoryError> {
        if Self::ELEMENT_SIZE == 0 {
            return Err(MemoryError::ZeroSizedElement);
        }
        let raw = RawBlock::zeroed(size)?;
        tracing::trace!(size, ?access, address = ?raw.as_ptr(), "allocated memory block");
        Ok(Self {
            raw,
            access,
            _marker: PhantomData,
        })
    }

    /// Allocate a zeroed block holding exactly `len` elements.
    pub fn with_len(len: usize) -> Result<Self, MemoryError> {
        let size = len
            .checked_mul(Self::ELEMENT_SIZE)
            .ok_or(MemoryError::ResourceCreation { size: usize::MAX })?;
        Self::new(size)
    }

    /// Copy another block. `size` defaults to the source size; a larger size
    /// leaves the tail zeroed, a smaller one truncates.
    pub fn from_block(source: &MemoryBlock<T>, size: Option<usize>) -> Result<Self, MemoryError> {
        let mut block = Self::new(size.unwrap_or(source.size()))?;
        block.write_prefix(source.as_bytes());
        Ok(block)
    }

    /// Copy a slice of elements. `size` behaves as in [`from_block`](Self::from_block).
    pub fn from_slice(source: &[T], size: Option<usize>) -> Result<Self, MemoryError> {
        let bytes: &[u8] = bytemuck::cast_slice(source);
        let mut block = Self::new(size.unwrap_or(bytes.len()))?;
        block.write_prefix(bytes);
        Ok(block)
    }

    /// Copy raw bytes.
    pub fn from_bytes(source: &[u8]) -> Result<Self, MemoryError> {
        let mut block = Self::new(source.len())?;
        block.write_prefix(source);
        Ok(block)
    }

    /// Copy `size` bytes starting at `source`. A null `source` yields a zeroed block.
    ///
    /// # Safety
    /// A non-null `source` must be valid for reads of `size` bytes.
    pub unsafe fn from_raw(source: *const u8, size: usize) -> Result<Self, MemoryError> {
        if source.is_null() {
            return Self::new(size);
        }
        // SAFETY: upheld by the caller.
        let bytes = unsafe { std::slice::from_raw_parts(source, size) };
        Self::from_bytes(bytes)
    }

    fn write_prefix(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.raw.size());
        self.raw.bytes_mut()[..n].copy_from_slice(&bytes[..n]);
        n
    }

    pub(crate) fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    /// Base address, null once released.
    #[inline]
    pub fn address(&self) -> *const u8 {
        self.raw.as_ptr()
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.raw.size()
    }

    /// Number of addressable elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.size() / Self::ELEMENT_SIZE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.raw.is_released()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.raw.bytes()
    }

    pub fn as_slice(&self) -> &[T] {
        let len = self.len();
        if len == 0 {
            return &[];
        }
        bytemuck::cast_slice(&self.raw.bytes()[..len * Self::ELEMENT_SIZE])
    }

    pub fn as_mut_slice(&mut self) -> Result<&mut [T], MemoryError> {
        if self.access == Access::ReadOnly {
            return Err(MemoryError::ReadOnly);
        }
        let len = self.len();
        if len == 0 {
            return Ok(&mut []);
        }
        Ok(bytemuck::cast_slice_mut(
            &mut self.raw.bytes_mut()[..len * Self::ELEMENT_SIZE],
        ))
    }

    pub fn get(&self, index: usize) -> Result<T, MemoryError> {
        self.as_slice()
            .get(index)
            .copied()
            .ok_or(MemoryError::OutOfRange {
                index,
                len: self.len(),
            })
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<(), MemoryError> {
        let len = self.len();
        let slot = self
            .as_mut_slice()?
            .get_mut(index)
            .ok_or(MemoryError::OutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: T) -> Result<(), MemoryError> {
        self.as_mut_slice()?.fill(value);
        Ok(())
    }

    /// Copy into `destination`, returning the number of bytes copied.
    ///
    /// `size` defaults to the destination size; the copy is clamped to both blocks.
    pub fn copy_to(
        &self,
        destination: &mut MemoryBlock<T>,
        size: Option<usize>,
    ) -> Result<usize, MemoryError> {
        if destination.access == Access::ReadOnly {
            return Err(MemoryError::ReadOnly);
        }
        let n = size
            .unwrap_or(destination.size())
            .min(self.size())
            .min(destination.size());
        destination.raw.bytes_mut()[..n].copy_from_slice(&self.raw.bytes()[..n]);
        Ok(n)
    }

    /// Copy into a slice, returning the number of elements copied.
    pub fn copy_to_slice(&self, destination: &mut [T]) -> usize {
        let src = self.as_slice();
        let n = src.len().min(destination.len());
        destination[..n].copy_from_slice(&src[..n]);
        n
    }

    /// Owned copy of the contents.
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// Index of the first element equal to `value`.
    ///
    /// Linear scan, slow for big blocks.
    pub fn find(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.as_slice().iter().position(|item| item == value)
    }

    /// Index of the first element matching `predicate`.
    ///
    /// Linear scan, slow for big blocks.
    pub fn find_by(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.as_slice().iter().position(|item| predicate(item))
    }

    /// Free the backing memory. Safe to call any number of times.
    pub fn release(&mut self) {
        if !self.raw.is_released() {
            tracing::trace!(size = self.raw.size(), "released memory block");
        }
        self.raw.release();
    }
}

impl<T> fmt::Debug for MemoryBlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("address", &self.raw.as_ptr())
            .field("size", &self.raw.size())
            .field("access", &self.access)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_elements_are_rejected() {
        assert_eq!(
            MemoryBlock::<()>::new(4).unwrap_err(),
            MemoryError::ZeroSizedElement
        );
    }

    #[test]
    fn element_count_follows_size() {
        let block = MemoryBlock::<u32>::new(18).unwrap();
        assert_eq!(block.size(), 18);
        assert_eq!(block.len(), 4);
        assert_eq!(block.as_slice(), &[0, 0, 0, 0]);
    }

    #[test]
    fn indexed_access_is_bounds_checked() {
        let mut block = MemoryBlock::<u32>::with_len(3).unwrap();
        block.set(2, 7).unwrap();
        assert_eq!(block.get(2), Ok(7));
        assert_eq!(
            block.get(3),
            Err(MemoryError::OutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            block.set(5, 1),
            Err(MemoryError::OutOfRange { index: 5, len: 3 })
        );
    }

    #[test]
    fn read_only_access_rejects_writes() {
        let mut block = MemoryBlock::<u32>::with_access(16, Access::ReadOnly).unwrap();
        assert_eq!(block.set(0, 1), Err(MemoryError::ReadOnly));
        assert_eq!(block.get(0), Ok(0));
    }

    #[test]
    fn copies_from_sources() {
        let src = MemoryBlock::from_slice(&[1u32, 2, 3], None).unwrap();
        let grown = MemoryBlock::from_block(&src, Some(20)).unwrap();
        assert_eq!(grown.to_vec(), vec![1, 2, 3, 0, 0]);

        let truncated = MemoryBlock::from_block(&src, Some(8)).unwrap();
        assert_eq!(truncated.to_vec(), vec![1, 2]);

        let bytes = MemoryBlock::<u8>::from_bytes(&[9, 8, 7]).unwrap();
        let raw = unsafe { MemoryBlock::<u8>::from_raw(bytes.address(), bytes.size()) }.unwrap();
        assert_eq!(raw.to_vec(), vec![9, 8, 7]);

        let zeroed = unsafe { MemoryBlock::<u8>::from_raw(std::ptr::null(), 4) }.unwrap();
        assert_eq!(zeroed.to_vec(), vec![0; 4]);
    }

    #[test]
    fn copy_to_is_clamped() {
        let src = MemoryBlock::from_slice(&[1u32, 2, 3, 4], None).unwrap();
        let mut dst = MemoryBlock::<u32>::with_len(2).unwrap();
        assert_eq!(src.copy_to(&mut dst, None), Ok(8));
        assert_eq!(dst.to_vec(), vec![1, 2]);

        let mut wide = MemoryBlock::<u32>::with_len(6).unwrap();
        assert_eq!(src.copy_to(&mut wide, Some(4)), Ok(4));
        assert_eq!(wide.to_vec(), vec![1, 0, 0, 0, 0, 0]);

        let mut out = [0u32; 3];
        assert_eq!(src.copy_to_slice(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn find_scans_linearly() {
        let block = MemoryBlock::from_slice(&[5u32, 6, 7, 6], None).unwrap();
        assert_eq!(block.find(&6), Some(1));
        assert_eq!(block.find(&9), None);
        assert_eq!(block.find_by(|v| *v > 6), Some(2));
        assert_eq!(block.find_by(|v| *v > 10), None);
    }

    #[test]
    fn release_is_idempotent() {
        let mut block = MemoryBlock::<u32>::with_len(8).unwrap();
        block.release();
        block.release();
        assert!(block.is_released());
        assert!(block.address().is_null());
        assert_eq!(block.len(), 0);
        assert!(block.get(0).is_err());
    }
}
