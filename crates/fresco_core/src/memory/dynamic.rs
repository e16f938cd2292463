use super::{round_up, MemoryBlock, MemoryError, PAGE_GRANULARITY};
use bytemuck::Pod;
use std::mem::size_of;

/// A resizable block that keeps its size a multiple of an alignment quantum.
///
/// Growth happens when a write lands past capacity; shrinking happens one
/// alignment unit at a time after removals. Resizing always allocates a new
/// block and copies the overlapping prefix, never grows in place, so
/// [`address`](Self::address) may change across any mutating call.
#[derive(Debug)]
pub struct DynamicMemory<T> {
    block: MemoryBlock<T>,
    alignment: usize,
    count: usize,
    cursor: usize,
}

impl<T: Pod> DynamicMemory<T> {
    /// One alignment unit of [`PAGE_GRANULARITY`].
    pub fn new() -> Result<Self, MemoryError> {
        Self::with_alignment(1, PAGE_GRANULARITY)
    }

    /// A block of at least `size` bytes, rounded up to `alignment`.
    pub fn with_alignment(size: usize, alignment: usize) -> Result<Self, MemoryError> {
        if alignment == 0 {
            return Err(MemoryError::InvalidAlignment);
        }
        Ok(Self {
            block: MemoryBlock::new(round_up(size.max(1), alignment))?,
            alignment,
            count: 0,
            cursor: 0,
        })
    }

    /// A block holding `source`, with the cursor placed after the last element.
    pub fn from_slice(source: &[T], alignment: usize) -> Result<Self, MemoryError> {
        if alignment == 0 {
            return Err(MemoryError::InvalidAlignment);
        }
        let size = round_up(std::mem::size_of_val(source).max(1), alignment);
        Ok(Self {
            block: MemoryBlock::from_slice(source, Some(size))?,
            alignment,
            count: source.len(),
            cursor: source.len(),
        })
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Number of occupied elements.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Index the next [`append`](Self::append) writes to.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Capacity in elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block.len()
    }

    /// Number of occupied elements, same as [`count`](Self::count).
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.block.size()
    }

    #[inline]
    pub fn address(&self) -> *const u8 {
        self.block.address()
    }

    pub fn as_slice(&self) -> &[T] {
        self.block.as_slice()
    }

    /// The occupied prefix.
    pub fn occupied(&self) -> &[T] {
        let slice = self.block.as_slice();
        &slice[..self.count.min(slice.len())]
    }

    pub fn get(&self, index: usize) -> Result<T, MemoryError> {
        self.block.get(index)
    }

    /// Write `value` at `index`, growing until the index is in range.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), MemoryError> {
        while index >= self.capacity() {
            self.grow()?;
        }
        self.block.set(index, value)
    }

    /// Move the write cursor. It may sit anywhere up to capacity.
    pub fn seek(&mut self, cursor: usize) -> Result<(), MemoryError> {
        if cursor > self.capacity() {
            return Err(MemoryError::OutOfRange {
                index: cursor,
                len: self.capacity(),
            });
        }
        self.cursor = cursor;
        Ok(())
    }

    /// Write `value` at the cursor, then advance the cursor and occupancy.
    pub fn append(&mut self, value: T) -> Result<(), MemoryError> {
        while self.cursor >= self.capacity() {
            self.grow()?;
        }
        self.block.set(self.cursor, value)?;
        self.cursor += 1;
        self.count += 1;
        Ok(())
    }

    /// Remove the first element equal to `value`, shifting the rest left.
    ///
    /// Linear scan and shift, slow for big blocks. Returns whether an
    /// element was removed.
    pub fn remove_value(&mut self, value: &T) -> Result<bool, MemoryError>
    where
        T: PartialEq,
    {
        let live = self.live();
        let Some(index) = self.block.as_slice()[..live].iter().position(|v| v == value) else {
            return Ok(false);
        };
        let slice = &mut self.block.as_mut_slice()?[..live];
        slice.copy_within(index + 1.., index);
        slice[live - 1] = T::zeroed();
        self.cursor = self.cursor.saturating_sub(1);
        self.count = self.count.saturating_sub(1);
        self.shrink_if_sparse()?;
        Ok(true)
    }

    /// Remove and return the element just before the cursor.
    pub fn remove_last(&mut self) -> Result<T, MemoryError> {
        if self.count == 0 || self.cursor == 0 {
            return Err(MemoryError::EmptyCollection);
        }
        let index = self.cursor - 1;
        let value = self.block.get(index)?;
        self.block.set(index, T::zeroed())?;
        self.cursor -= 1;
        self.count -= 1;
        self.shrink_if_sparse()?;
        Ok(value)
    }

    /// Reallocate to `size` bytes rounded up to the alignment, keeping the
    /// overlapping prefix.
    pub fn resize(&mut self, size: usize) -> Result<(), MemoryError> {
        let aligned = round_up(size, self.alignment);
        self.reallocate(aligned)?;
        let capacity = self.capacity();
        self.count = self.count.min(capacity);
        self.cursor = self.cursor.min(capacity);
        Ok(())
    }

    /// Index of the first written element equal to `value`.
    pub fn find(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.block.as_slice()[..self.live()]
            .iter()
            .position(|v| v == value)
    }

    pub fn find_by(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.block.as_slice()[..self.live()].iter().position(predicate)
    }

    pub fn copy_to(
        &self,
        destination: &mut MemoryBlock<T>,
        size: Option<usize>,
    ) -> Result<usize, MemoryError> {
        self.block.copy_to(destination, size)
    }

    /// Free the backing memory and forget all elements. Idempotent.
    pub fn release(&mut self) {
        self.block.release();
        self.count = 0;
        self.cursor = 0;
    }

    /// Length of the written prefix: everything below the count or the cursor.
    fn live(&self) -> usize {
        self.count.max(self.cursor).min(self.capacity())
    }

    fn grow(&mut self) -> Result<(), MemoryError> {
        let size = self.size();
        let stepped = round_up(size + size_of::<T>(), self.alignment);
        self.reallocate(stepped.max(size + self.alignment))
    }

    fn shrink_if_sparse(&mut self) -> Result<(), MemoryError> {
        let size = self.size();
        if size <= self.alignment {
            return Ok(());
        }
        let occupied = self.count.max(self.cursor) * size_of::<T>();
        if occupied <= size - self.alignment {
            self.reallocate(size - self.alignment)?;
        }
        Ok(())
    }

    fn reallocate(&mut self, size: usize) -> Result<(), MemoryError> {
        let next = MemoryBlock::from_block(&self.block, Some(size))?;
        tracing::debug!(from = self.size(), to = size, "resized dynamic memory");
        let mut previous = std::mem::replace(&mut self.block, next);
        previous.release();
        Ok(())
    }
}
