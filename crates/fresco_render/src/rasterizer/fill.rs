use super::target::SharedTarget;
use super::triangle::Triangle;
use glam::{Vec2, Vec4};
use std::ops::{Add, Mul, Sub};

/// Pixels tested per step.
pub(crate) const LANES: usize = 8;

/// Fills one triangle into the shared target.
pub(crate) type FillTriangle = fn(&Triangle, &SharedTarget<'_>);

/// Pack a 0..1 color as `R | G << 8 | B << 16 | A << 24`.
///
/// Channels are clamped, scaled by 255 and truncated.
#[inline]
pub fn pack_color(color: Vec4) -> u32 {
    let c = color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
    (c.x as u32) | (c.y as u32) << 8 | (c.z as u32) << 16 | (c.w as u32) << 24
}

/// Lanes inside the bounding-box span starting at `x`.
#[inline]
pub(crate) fn span_mask(x: usize, max_x: usize) -> u8 {
    let remaining = max_x + 1 - x;
    if remaining >= LANES {
        u8::MAX
    } else {
        (1u8 << remaining) - 1
    }
}

/// Eight f32 lanes with element-wise arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct F32x8([f32; LANES]);

impl F32x8 {
    #[inline(always)]
    pub fn splat(value: f32) -> Self {
        Self([value; LANES])
    }

    /// `start, start + 1, ..., start + 7`
    #[inline(always)]
    pub fn ramp(start: f32) -> Self {
        Self(std::array::from_fn(|i| start + i as f32))
    }

    #[inline(always)]
    fn zip(self, rhs: Self, op: impl Fn(f32, f32) -> f32) -> Self {
        Self(std::array::from_fn(|i| op(self.0[i], rhs.0[i])))
    }

    /// Bit `i` set when lane `i` is `>= 0`.
    #[inline(always)]
    pub fn mask_non_negative(self) -> u8 {
        self.0
            .iter()
            .enumerate()
            .fold(0u8, |mask, (i, v)| mask | (u8::from(*v >= 0.0) << i))
    }

    #[inline(always)]
    pub fn lane(self, i: usize) -> f32 {
        self.0[i]
    }
}

impl Add for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a + b)
    }
}

impl Sub for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a - b)
    }
}

impl Mul for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a * b)
    }
}

#[inline(always)]
fn edge8(a: Vec2, b: Vec2, x: F32x8, y: F32x8) -> F32x8 {
    F32x8::splat(b.x - a.x) * (y - F32x8::splat(a.y))
        - F32x8::splat(b.y - a.y) * (x - F32x8::splat(a.x))
}

/// Portable 8-lane fill.
pub(crate) fn fill_lanes8(tri: &Triangle, target: &SharedTarget<'_>) {
    let [a, b, c] = tri.points;
    let [ca, cb, cc] = tri.colors;
    let inv_area = F32x8::splat(tri.area.recip());
    let bounds = tri.bounds;

    for y in bounds.min_y..=bounds.max_y {
        let py = F32x8::splat(y as f32);
        let mut x = bounds.min_x;
        while x <= bounds.max_x {
            let px = F32x8::ramp(x as f32);
            // Each edge is opposite the vertex whose weight it yields.
            let ea = edge8(b, c, px, py);
            let eb = edge8(c, a, px, py);
            let ec = edge8(a, b, px, py);

            let mask = ea.mask_non_negative()
                & eb.mask_non_negative()
                & ec.mask_non_negative()
                & span_mask(x, bounds.max_x);

            if mask != 0 {
                let wa = ea * inv_area;
                let wb = eb * inv_area;
                let wc = ec * inv_area;
                let pixels: [u32; LANES] = std::array::from_fn(|i| {
                    pack_color(ca * wa.lane(i) + cb * wb.lane(i) + cc * wc.lane(i))
                });
                target.store_lanes(x, y, &pixels, mask);
            }
            x += LANES;
        }
    }
}
