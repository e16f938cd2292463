use super::{MemoryError, BLOCK_ALIGN};
use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};
use std::slice;

/// Owned, zero-initialized, page-aligned byte arena.
///
/// An empty arena owns no allocation. Releasing is idempotent.
pub(crate) struct RawBlock {
    alloc: Option<(NonNull<u8>, Layout)>,
    size: usize,
}

// SAFETY: RawBlock uniquely owns its allocation, like Box<[u8]>.
unsafe impl Send for RawBlock {}
unsafe impl Sync for RawBlock {}

impl RawBlock {
    pub fn zeroed(size: usize) -> Result<Self, MemoryError> {
        if size == 0 {
            return Ok(Self::empty());
        }
        let layout = Layout::from_size_align(size, BLOCK_ALIGN)
            .map_err(|_| MemoryError::ResourceCreation { size })?;
        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(MemoryError::ResourceCreation { size })?;
        Ok(Self {
            alloc: Some((ptr, layout)),
            size,
        })
    }

    pub const fn empty() -> Self {
        Self {
            alloc: None,
            size: 0,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.alloc.is_none()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.alloc
            .map_or(ptr::null(), |(ptr, _)| ptr.as_ptr() as *const u8)
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        match self.alloc {
            // SAFETY: the allocation is `size` bytes long and zero-initialized on creation.
            Some((ptr, _)) => unsafe { slice::from_raw_parts(ptr.as_ptr(), self.size) },
            None => &[],
        }
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        match self.alloc {
            // SAFETY: as above, and `&mut self` guarantees exclusive access.
            Some((ptr, _)) => unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), self.size) },
            None => &mut [],
        }
    }

    pub fn release(&mut self) {
        if let Some((ptr, layout)) = self.alloc.take() {
            // SAFETY: ptr was returned by alloc_zeroed with this exact layout
            // and `take` guarantees it is freed once.
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        }
        self.size = 0;
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_block_is_page_aligned_and_clear() {
        let block = RawBlock::zeroed(100).unwrap();
        assert_eq!(block.size(), 100);
        assert_eq!(block.as_ptr() as usize % BLOCK_ALIGN, 0);
        assert!(block.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_block_owns_nothing() {
        let block = RawBlock::zeroed(0).unwrap();
        assert!(block.is_released());
        assert!(block.as_ptr().is_null());
        assert!(block.bytes().is_empty());
    }

    #[test]
    fn release_twice_is_harmless() {
        let mut block = RawBlock::zeroed(64).unwrap();
        block.release();
        block.release();
        assert!(block.is_released());
        assert_eq!(block.size(), 0);
    }
}
