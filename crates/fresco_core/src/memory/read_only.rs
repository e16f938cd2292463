use super::{Access, MemoryBlock, MemoryError};
use bytemuck::Pod;

/// A block that can only be read after construction.
///
/// Construction copies the source once, so later writes to the source are
/// never observed through this view.
#[derive(Debug)]
pub struct ReadOnlyMemory<T> {
    block: MemoryBlock<T>,
}

impl<T: Pod> ReadOnlyMemory<T> {
    /// A zeroed read-only block of `size` bytes.
    pub fn new(size: usize) -> Result<Self, MemoryError> {
        Ok(Self::seal(MemoryBlock::new(size)?))
    }

    pub fn from_block(source: &MemoryBlock<T>, size: Option<usize>) -> Result<Self, MemoryError> {
        Ok(Self::seal(MemoryBlock::from_block(source, size)?))
    }

    pub fn from_slice(source: &[T], size: Option<usize>) -> Result<Self, MemoryError> {
        Ok(Self::seal(MemoryBlock::from_slice(source, size)?))
    }

    pub fn from_bytes(source: &[u8]) -> Result<Self, MemoryError> {
        Ok(Self::seal(MemoryBlock::from_bytes(source)?))
    }

    /// # Safety
    /// A non-null `source` must be valid for reads of `size` bytes.
    pub unsafe fn from_raw(source: *const u8, size: usize) -> Result<Self, MemoryError> {
        // SAFETY: forwarded to the caller.
        Ok(Self::seal(unsafe { MemoryBlock::from_raw(source, size) }?))
    }

    fn seal(mut block: MemoryBlock<T>) -> Self {
        block.set_access(Access::ReadOnly);
        Self { block }
    }

    #[inline]
    pub fn address(&self) -> *const u8 {
        self.block.address()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.block.size()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.block.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    #[inline]
    pub fn access(&self) -> Access {
        self.block.access()
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.block.is_released()
    }

    pub fn as_slice(&self) -> &[T] {
        self.block.as_slice()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.block.as_bytes()
    }

    pub fn get(&self, index: usize) -> Result<T, MemoryError> {
        self.block.get(index)
    }

    pub fn copy_to(
        &self,
        destination: &mut MemoryBlock<T>,
        size: Option<usize>,
    ) -> Result<usize, MemoryError> {
        self.block.copy_to(destination, size)
    }

    pub fn copy_to_slice(&self, destination: &mut [T]) -> usize {
        self.block.copy_to_slice(destination)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.block.to_vec()
    }

    pub fn find(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.block.find(value)
    }

    pub fn find_by(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.block.find_by(predicate)
    }

    pub fn release(&mut self) {
        self.block.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_ignores_later_source_writes() {
        let mut source = MemoryBlock::from_slice(&[1u32, 2, 3], None).unwrap();
        let view = ReadOnlyMemory::from_block(&source, None).unwrap();
        source.set(0, 42).unwrap();

        assert_eq!(view.get(0), Ok(1));
        assert_eq!(view.access(), Access::ReadOnly);
        assert_eq!(view.find(&3), Some(2));
    }

    #[test]
    fn can_copy_out_but_not_in() {
        let view = ReadOnlyMemory::from_slice(&[4u16, 5], None).unwrap();
        let mut dst = MemoryBlock::<u16>::with_len(2).unwrap();
        assert_eq!(view.copy_to(&mut dst, None), Ok(4));
        assert_eq!(dst.to_vec(), vec![4, 5]);
    }

    #[test]
    fn release_twice_is_harmless() {
        let mut view = ReadOnlyMemory::<u8>::from_bytes(&[1, 2, 3]).unwrap();
        view.release();
        view.release();
        assert!(view.is_released());
        assert_eq!(view.get(0), Err(MemoryError::OutOfRange { index: 0, len: 0 }));
    }
}
