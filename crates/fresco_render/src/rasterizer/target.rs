use glam::UVec2;
use std::mem::align_of;
use std::sync::atomic::{AtomicU32, Ordering};

const _: () = assert!(align_of::<AtomicU32>() == align_of::<u32>());

/// Color buffer shared by all fill workers of one draw.
///
/// Stores are relaxed atomics: triangles that overlap race on the shared
/// pixels and the last store wins, but no store is ever torn.
pub(crate) struct SharedTarget<'a> {
    pixels: &'a [AtomicU32],
    width: usize,
    height: usize,
}

impl<'a> SharedTarget<'a> {
    /// `pixels` must hold at least `size.x * size.y` entries.
    pub fn new(pixels: &'a mut [u32], size: UVec2) -> Self {
        let width = size.x as usize;
        let height = size.y as usize;
        debug_assert!(pixels.len() >= width * height);
        // SAFETY: AtomicU32 has the size and bit validity of u32 and the
        // same alignment (asserted above). The exclusive borrow guarantees no
        // non-atomic access to the pixels while this view is alive.
        let pixels = unsafe { &*(pixels as *mut [u32] as *const [AtomicU32]) };
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Store every lane whose `mask` bit is set, starting at column `x` of
    /// image row `y`. Image rows count from the bottom, memory rows from the top.
    #[inline]
    pub fn store_lanes(&self, x: usize, y: usize, lanes: &[u32; 8], mask: u8) {
        let row = (self.height - 1 - y) * self.width;
        let mut bits = mask;
        while bits != 0 {
            let lane = bits.trailing_zeros() as usize;
            self.pixels[row + x + lane].store(lanes[lane], Ordering::Relaxed);
            bits &= bits - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_masked_lanes_on_flipped_rows() {
        let mut pixels = vec![0u32; 16 * 2];
        {
            let target = SharedTarget::new(&mut pixels, UVec2::new(16, 2));
            target.store_lanes(4, 0, &[1, 2, 3, 4, 5, 6, 7, 8], 0b1000_0101);
        }
        // Image row 0 is the last memory row.
        assert!(pixels[..16].iter().all(|&p| p == 0));
        let bottom = &pixels[16..];
        assert_eq!(bottom[4], 1);
        assert_eq!(bottom[5], 0);
        assert_eq!(bottom[6], 3);
        assert_eq!(bottom[11], 8);
    }
}
