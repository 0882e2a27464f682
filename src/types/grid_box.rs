use std::fmt;

use glam::{DVec3, I64Vec3, IVec3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;
use crate::types::bounds::ContinuousBox;
use crate::types::layout::{self, BOX_LEN};

/// log2 of the chunk edge length in grid cells.
pub const CHUNK_BITS: u32 = 4;
pub const CHUNK_SIZE: i32 = 1 << CHUNK_BITS;

/// Chunk coordinate of a world coordinate (floor, then arithmetic shift).
pub fn chunk_coord(v: f64) -> i32 {
    chunk_coord_with(v, CHUNK_BITS)
}

/// [`chunk_coord`] for `1 << bits`-unit chunks.
pub fn chunk_coord_with(v: f64, bits: u32) -> i32 {
    chunk_of(v.floor() as i32, bits)
}

/// Floor division of a cell coordinate by `1 << bits`. Widths of 32 bits or
/// more put every cell in chunk 0 or -1.
pub fn chunk_of(cell: i32, bits: u32) -> i32 {
    cell.checked_shr(bits).unwrap_or(if cell < 0 { -1 } else { 0 })
}

/// The grid cell whose unit cube contains `p`.
pub fn block_containing(p: DVec3) -> IVec3 {
    p.floor().as_ivec3()
}

/// Axis-aligned box over integer grid cells. Bounds are inclusive on both
/// ends, so `(0,0,0)-(0,0,0)` is one cell.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridBox {
    pub min_x: i32,
    pub min_y: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_y: i32,
    pub max_z: i32,
}

impl GridBox {
    pub const INVERTED: GridBox = GridBox {
        min_x: i32::MAX,
        min_y: i32::MAX,
        min_z: i32::MAX,
        max_x: i32::MIN,
        max_y: i32::MIN,
        max_z: i32::MIN,
    };

    pub fn new(min_x: i32, min_y: i32, min_z: i32, max_x: i32, max_y: i32, max_z: i32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            min_z: min_z.min(max_z),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
            max_z: min_z.max(max_z),
        }
    }

    pub const fn new_unchecked(
        min_x: i32,
        min_y: i32,
        min_z: i32,
        max_x: i32,
        max_y: i32,
        max_z: i32,
    ) -> Self {
        Self {
            min_x,
            min_y,
            min_z,
            max_x,
            max_y,
            max_z,
        }
    }

    pub fn from_corners(a: IVec3, b: IVec3) -> Self {
        Self::new(a.x, a.y, a.z, b.x, b.y, b.z)
    }

    /// Smallest box holding every cell, or `None` for an empty input.
    pub fn from_cells(cells: impl IntoIterator<Item = IVec3>) -> Option<Self> {
        let mut cells = cells.into_iter();
        let first = cells.next()?;
        let mut b = Self::from_corners(first, first);
        for cell in cells {
            b.expand_to(cell);
        }
        Some(b)
    }

    pub fn min(&self) -> IVec3 {
        IVec3::new(self.min_x, self.min_y, self.min_z)
    }

    pub fn max(&self) -> IVec3 {
        IVec3::new(self.max_x, self.max_y, self.max_z)
    }

    pub fn intersects(&self, other: &GridBox) -> bool {
        self.max_x >= other.min_x
            && self.max_y >= other.min_y
            && self.max_z >= other.min_z
            && self.min_x <= other.max_x
            && self.min_y <= other.max_y
            && self.min_z <= other.max_z
    }

    pub fn contains(&self, cell: IVec3) -> bool {
        cell.x >= self.min_x
            && cell.x <= self.max_x
            && cell.y >= self.min_y
            && cell.y <= self.max_y
            && cell.z >= self.min_z
            && cell.z <= self.max_z
    }

    /// Whether a real point lies within the volume covered by the cells,
    /// i.e. in `[min, max + 1]` on every axis.
    pub fn contains_point(&self, p: DVec3) -> bool {
        self.to_continuous_box().contains(p)
    }

    pub fn expand_to(&mut self, cell: IVec3) -> &mut Self {
        self.min_x = self.min_x.min(cell.x);
        self.min_y = self.min_y.min(cell.y);
        self.min_z = self.min_z.min(cell.z);
        self.max_x = self.max_x.max(cell.x);
        self.max_y = self.max_y.max(cell.y);
        self.max_z = self.max_z.max(cell.z);
        self
    }

    pub fn expand_to_box(&mut self, other: &GridBox) -> &mut Self {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.min_z = self.min_z.min(other.min_z);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
        self.max_z = self.max_z.max(other.max_z);
        self
    }

    /// Push faces outward per axis. Saturates at the `i32` range.
    pub fn expand(&mut self, amounts: IVec3) -> &mut Self {
        self.min_x = self.min_x.saturating_sub(amounts.x);
        self.min_y = self.min_y.saturating_sub(amounts.y);
        self.min_z = self.min_z.saturating_sub(amounts.z);
        self.max_x = self.max_x.saturating_add(amounts.x);
        self.max_y = self.max_y.saturating_add(amounts.y);
        self.max_z = self.max_z.saturating_add(amounts.z);
        self
    }

    pub fn expanded(&self, amounts: IVec3) -> Self {
        let mut b = *self;
        b.expand(amounts);
        b
    }

    /// Saturates at the `i32` range.
    pub fn translate(&mut self, delta: IVec3) -> &mut Self {
        self.min_x = self.min_x.saturating_add(delta.x);
        self.min_y = self.min_y.saturating_add(delta.y);
        self.min_z = self.min_z.saturating_add(delta.z);
        self.max_x = self.max_x.saturating_add(delta.x);
        self.max_y = self.max_y.saturating_add(delta.y);
        self.max_z = self.max_z.saturating_add(delta.z);
        self
    }

    pub fn translated(&self, delta: IVec3) -> Self {
        let mut b = *self;
        b.translate(delta);
        b
    }

    /// Clip to the overlap with `other`. Disjoint inputs leave an inverted box.
    pub fn intersect(&mut self, other: &GridBox) -> &mut Self {
        self.min_x = self.min_x.max(other.min_x);
        self.min_y = self.min_y.max(other.min_y);
        self.min_z = self.min_z.max(other.min_z);
        self.max_x = self.max_x.min(other.max_x);
        self.max_y = self.max_y.min(other.max_y);
        self.max_z = self.max_z.min(other.max_z);
        self
    }

    pub fn intersection(&self, other: &GridBox) -> Self {
        let mut b = *self;
        b.intersect(other);
        b
    }

    /// Integer midpoint, truncated toward zero.
    pub fn center(&self) -> IVec3 {
        ((self.min().as_i64vec3() + self.max().as_i64vec3()) / 2).as_ivec3()
    }

    /// `max - min` per axis (one less than the cell count). Widened so boxes
    /// spanning the whole `i32` range do not overflow.
    pub fn size(&self) -> I64Vec3 {
        self.max().as_i64vec3() - self.min().as_i64vec3()
    }

    pub fn width(&self) -> i64 {
        i64::from(self.max_x) - i64::from(self.min_x) + 1
    }

    pub fn height(&self) -> i64 {
        i64::from(self.max_y) - i64::from(self.min_y) + 1
    }

    pub fn length(&self) -> i64 {
        i64::from(self.max_z) - i64::from(self.min_z) + 1
    }

    /// Number of cells covered.
    pub fn volume(&self) -> i64 {
        self.width() * self.height() * self.length()
    }

    /// Chunks covered by these cells.
    pub fn chunk_bounds(&self) -> GridBox {
        self.chunk_bounds_with(CHUNK_BITS)
    }

    pub fn chunk_bounds_with(&self, bits: u32) -> GridBox {
        GridBox::new(
            chunk_of(self.min_x, bits),
            chunk_of(self.min_y, bits),
            chunk_of(self.min_z, bits),
            chunk_of(self.max_x, bits),
            chunk_of(self.max_y, bits),
            chunk_of(self.max_z, bits),
        )
    }

    /// The real volume covered by the cells: `[min, max + 1]`.
    pub fn to_continuous_box(&self) -> ContinuousBox {
        let min = self.min().as_dvec3();
        let max = self.max().as_dvec3() + DVec3::ONE;
        ContinuousBox::new_unchecked(min.x, min.y, min.z, max.x, max.y, max.z)
    }

    pub fn to_array(&self) -> [i32; BOX_LEN] {
        bytemuck::cast(*self)
    }

    pub fn from_slice(values: &[i32]) -> Result<Self> {
        let v = layout::fixed_size(values, BOX_LEN)?;
        Ok(Self::new(v[0], v[1], v[2], v[3], v[4], v[5]))
    }
}

impl fmt::Display for GridBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}] → [{}, {}, {}]",
            self.min_x, self.min_y, self.min_z, self.max_x, self.max_y, self.max_z
        )
    }
}

impl Serialize for GridBox {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_seq(self.to_array())
    }
}

impl<'de> Deserialize<'de> for GridBox {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = Vec::<i32>::deserialize(d)?;
        Self::from_slice(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell_box() {
        let b = GridBox::new(0, 0, 0, 0, 0, 0);
        assert_eq!(b.volume(), 1);
        assert_eq!((b.width(), b.height(), b.length()), (1, 1, 1));
        assert_eq!(b.size(), I64Vec3::ZERO);
        assert!(b.contains(IVec3::ZERO));
        assert!(!b.contains(IVec3::X));
    }

    #[test]
    fn checked_constructor_sorts() {
        let b = GridBox::new(3, -1, 5, 0, 2, 4);
        assert_eq!(b.to_array(), [0, -1, 4, 3, 2, 5]);
    }

    #[test]
    fn volume_counts_cells() {
        let b = GridBox::new(0, 0, 0, 15, 15, 15);
        assert_eq!(b.volume(), 4096);
        let wide = GridBox::new(i32::MIN, 0, 0, i32::MAX, 0, 0);
        assert_eq!(wide.volume(), 1_i64 << 32);
    }

    #[test]
    fn full_range_extents_do_not_overflow() {
        let wide = GridBox::new(i32::MIN, i32::MIN, 0, i32::MAX, i32::MAX, 0);
        assert_eq!(wide.width(), 1_i64 << 32);
        assert_eq!(wide.height(), 1_i64 << 32);
        assert_eq!(wide.length(), 1);
        assert_eq!(wide.size(), I64Vec3::new(u32::MAX as i64, u32::MAX as i64, 0));
        assert_eq!(wide.center(), IVec3::new(0, 0, 0));
    }

    #[test]
    fn from_cells() {
        assert_eq!(GridBox::from_cells(std::iter::empty()), None);
        let b = GridBox::from_cells([IVec3::new(1, 5, -2), IVec3::new(-3, 0, 4), IVec3::new(0, 9, 0)])
            .unwrap();
        assert_eq!(b, GridBox::new(-3, 0, -2, 1, 9, 4));
    }

    #[test]
    fn intersection_of_overlapping() {
        let a = GridBox::new(0, 0, 0, 10, 10, 10);
        let b = GridBox::new(5, 5, 5, 15, 15, 15);
        assert!(a.intersects(&b) && b.intersects(&a));
        assert_eq!(a.intersection(&b), GridBox::new(5, 5, 5, 10, 10, 10));
        assert!(!a.intersects(&GridBox::new(11, 0, 0, 12, 1, 1)));
    }

    #[test]
    fn shared_cell_intersects() {
        let a = GridBox::new(0, 0, 0, 1, 1, 1);
        let b = GridBox::new(1, 1, 1, 2, 2, 2);
        assert!(a.intersects(&b));
        assert_eq!(a.intersection(&b).volume(), 1);
    }

    #[test]
    fn contains_point_includes_far_face() {
        let b = GridBox::new(0, 0, 0, 0, 0, 0);
        assert!(b.contains_point(DVec3::splat(0.5)));
        assert!(b.contains_point(DVec3::ONE));
        assert!(!b.contains_point(DVec3::new(1.01, 0.0, 0.0)));
        assert!(!b.contains_point(DVec3::new(-0.01, 0.0, 0.0)));
    }

    #[test]
    fn to_continuous_box_adds_one() {
        let b = GridBox::new(-1, 0, 2, 1, 0, 3);
        assert_eq!(
            b.to_continuous_box().to_array(),
            [-1.0, 0.0, 2.0, 2.0, 1.0, 4.0]
        );
        assert_eq!(ContinuousBox::from(b).volume(), 3.0 * 1.0 * 2.0);
    }

    #[test]
    fn expand_and_translate() {
        let b = GridBox::new(0, 0, 0, 1, 1, 1)
            .expanded(IVec3::new(1, 0, 2))
            .translated(IVec3::new(10, 0, 0));
        assert_eq!(b, GridBox::new(9, 0, -2, 12, 1, 3));
        let mut c = GridBox::new(0, 0, 0, 0, 0, 0);
        c.expand_to(IVec3::new(-2, 3, 0)).expand_to_box(&GridBox::new(5, 5, 5, 6, 6, 6));
        assert_eq!(c, GridBox::new(-2, 0, 0, 6, 6, 6));
    }

    #[test]
    fn translate_saturates() {
        let b = GridBox::new(0, 0, 0, i32::MAX - 1, 0, 0).translated(IVec3::new(5, 0, 0));
        assert_eq!(b.max_x, i32::MAX);
    }

    #[test]
    fn center_truncates() {
        assert_eq!(GridBox::new(0, 0, 0, 3, 4, 5).center(), IVec3::new(1, 2, 2));
        assert_eq!(GridBox::new(-3, 0, 0, 0, 0, 0).center(), IVec3::new(-1, 0, 0));
    }

    #[test]
    fn oversized_chunk_width_saturates() {
        let b = GridBox::new(-5, 0, 0, 5, 0, 0);
        assert_eq!(b.chunk_bounds_with(32), GridBox::new(-1, 0, 0, 0, 0, 0));
        assert_eq!(b.chunk_bounds_with(40), GridBox::new(-1, 0, 0, 0, 0, 0));
        assert_eq!(chunk_coord_with(-0.5, 33), -1);
        assert_eq!(chunk_coord_with(1e6, 64), 0);
        assert_eq!(chunk_of(-17, 4), -2);
    }

    #[test]
    fn chunk_bounds_shift() {
        assert_eq!(
            GridBox::new(0, 0, 0, 15, 15, 15).chunk_bounds(),
            GridBox::new(0, 0, 0, 0, 0, 0)
        );
        assert_eq!(
            GridBox::new(-1, 16, -16, 31, 17, -1).chunk_bounds(),
            GridBox::new(-1, 1, -1, 1, 1, -1)
        );
    }

    #[test]
    fn chunk_helpers() {
        assert_eq!(chunk_coord(0.0), 0);
        assert_eq!(chunk_coord(15.99), 0);
        assert_eq!(chunk_coord(16.0), 1);
        assert_eq!(chunk_coord(-0.01), -1);
        assert_eq!(chunk_coord(-16.0), -1);
        assert_eq!(chunk_coord(-16.5), -2);
        assert_eq!(block_containing(DVec3::new(-0.5, 2.0, 3.9)), IVec3::new(-1, 2, 3));
    }

    #[test]
    fn json_is_flat_six_list() {
        let b = GridBox::new(1, 2, 3, 4, 5, 6);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[1,2,3,4,5,6]");
        assert_eq!(serde_json::from_str::<GridBox>(&json).unwrap(), b);
        assert!(serde_json::from_str::<GridBox>("[1,2,3,4,5]").is_err());
    }
}
