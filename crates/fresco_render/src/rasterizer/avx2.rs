//! AVX2 fill for x86-64.

#[cfg(target_arch = "x86_64")]
pub(crate) use imp::fill_avx2;

/// Whether the running CPU can execute [`fill_avx2`].
pub(crate) fn is_supported() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::is_x86_feature_detected!("avx2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

#[cfg(target_arch = "x86_64")]
mod imp {
    use super::super::fill::{span_mask, LANES};
    use super::super::target::SharedTarget;
    use super::super::triangle::Triangle;
    use glam::Vec2;
    use std::arch::x86_64::*;

    pub(crate) fn fill_avx2(tri: &Triangle, target: &SharedTarget<'_>) {
        debug_assert!(super::is_supported());
        // SAFETY: this routine is only selected once `is_supported` returned true.
        unsafe { fill(tri, target) }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn fill(tri: &Triangle, target: &SharedTarget<'_>) {
        let [a, b, c] = tri.points;
        let [ca, cb, cc] = tri.colors;
        let bounds = tri.bounds;

        let zero = _mm256_setzero_ps();
        let inv_area = _mm256_set1_ps(tri.area.recip());
        let offsets = _mm256_setr_ps(0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0);
        let mut lanes = [0u32; LANES];

        for y in bounds.min_y..=bounds.max_y {
            let py = _mm256_set1_ps(y as f32);
            let mut x = bounds.min_x;
            while x <= bounds.max_x {
                let px = _mm256_add_ps(_mm256_set1_ps(x as f32), offsets);
                let ea = edge(b, c, px, py);
                let eb = edge(c, a, px, py);
                let ec = edge(a, b, px, py);

                let inside = _mm256_and_ps(
                    _mm256_and_ps(
                        _mm256_cmp_ps::<_CMP_GE_OQ>(ea, zero),
                        _mm256_cmp_ps::<_CMP_GE_OQ>(eb, zero),
                    ),
                    _mm256_cmp_ps::<_CMP_GE_OQ>(ec, zero),
                );
                let mask = _mm256_movemask_ps(inside) as u8 & span_mask(x, bounds.max_x);

                if mask != 0 {
                    let wa = _mm256_mul_ps(ea, inv_area);
                    let wb = _mm256_mul_ps(eb, inv_area);
                    let wc = _mm256_mul_ps(ec, inv_area);

                    let r = channel(ca.x, cb.x, cc.x, wa, wb, wc);
                    let g = channel(ca.y, cb.y, cc.y, wa, wb, wc);
                    let bl = channel(ca.z, cb.z, cc.z, wa, wb, wc);
                    let al = channel(ca.w, cb.w, cc.w, wa, wb, wc);

                    let packed = _mm256_or_si256(
                        _mm256_or_si256(r, _mm256_slli_epi32::<8>(g)),
                        _mm256_or_si256(_mm256_slli_epi32::<16>(bl), _mm256_slli_epi32::<24>(al)),
                    );
                    _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, packed);
                    target.store_lanes(x, y, &lanes, mask);
                }
                x += LANES;
            }
        }
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn edge(a: Vec2, b: Vec2, x: __m256, y: __m256) -> __m256 {
        _mm256_sub_ps(
            _mm256_mul_ps(_mm256_set1_ps(b.x - a.x), _mm256_sub_ps(y, _mm256_set1_ps(a.y))),
            _mm256_mul_ps(_mm256_set1_ps(b.y - a.y), _mm256_sub_ps(x, _mm256_set1_ps(a.x))),
        )
    }

    /// Blend one channel of the three vertex colors, clamp to 0..1 and scale to 0..255.
    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn channel(a: f32, b: f32, c: f32, wa: __m256, wb: __m256, wc: __m256) -> __m256i {
        let blended = _mm256_add_ps(
            _mm256_add_ps(
                _mm256_mul_ps(_mm256_set1_ps(a), wa),
                _mm256_mul_ps(_mm256_set1_ps(b), wb),
            ),
            _mm256_mul_ps(_mm256_set1_ps(c), wc),
        );
        let clamped = _mm256_min_ps(_mm256_max_ps(blended, _mm256_setzero_ps()), _mm256_set1_ps(1.0));
        _mm256_cvttps_epi32(_mm256_mul_ps(clamped, _mm256_set1_ps(255.0)))
    }
}
