use std::fmt;

use glam::{DMat4, DVec3, IVec3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;
use crate::types::grid_box::{CHUNK_BITS, GridBox};
use crate::types::layout::{self, BOX_LEN};
use crate::types::pose::Pose;

/// Axis-aligned box over real coordinates.
///
/// Checked constructors and setters keep `min <= max` on every axis by
/// swapping out-of-order bounds. The unchecked ones store what they are given,
/// which is how [`ContinuousBox::INVERTED`] seeds an accumulator. Operations
/// that can invert a box (negative [`expand`](Self::expand), [`intersect`](Self::intersect)
/// of disjoint boxes) leave it inverted.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ContinuousBox {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl ContinuousBox {
    /// Empty accumulator: `+inf` mins and `-inf` maxes. Any `expand_to` makes
    /// it the bound of exactly what was added.
    pub const INVERTED: ContinuousBox = ContinuousBox {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        min_z: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
        max_z: f64::NEG_INFINITY,
    };

    pub fn new(min_x: f64, min_y: f64, min_z: f64, max_x: f64, max_y: f64, max_z: f64) -> Self {
        let mut b = Self::default();
        b.set(min_x, min_y, min_z, max_x, max_y, max_z);
        b
    }

    pub const fn new_unchecked(
        min_x: f64,
        min_y: f64,
        min_z: f64,
        max_x: f64,
        max_y: f64,
        max_z: f64,
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

    /// Box spanned by two opposite corners, in any order.
    pub fn from_corners(a: DVec3, b: DVec3) -> Self {
        Self::new(a.x, a.y, a.z, b.x, b.y, b.z)
    }

    /// The unit cube occupied by a grid cell.
    pub fn from_block(cell: IVec3) -> Self {
        let min = cell.as_dvec3();
        let max = min + DVec3::ONE;
        Self::new_unchecked(min.x, min.y, min.z, max.x, max.y, max.z)
    }

    /// Sorting setter.
    pub fn set(
        &mut self,
        min_x: f64,
        min_y: f64,
        min_z: f64,
        max_x: f64,
        max_y: f64,
        max_z: f64,
    ) -> &mut Self {
        self.min_x = min_x.min(max_x);
        self.min_y = min_y.min(max_y);
        self.min_z = min_z.min(max_z);
        self.max_x = min_x.max(max_x);
        self.max_y = min_y.max(max_y);
        self.max_z = min_z.max(max_z);
        self
    }

    pub fn set_unchecked(
        &mut self,
        min_x: f64,
        min_y: f64,
        min_z: f64,
        max_x: f64,
        max_y: f64,
        max_z: f64,
    ) -> &mut Self {
        *self = Self::new_unchecked(min_x, min_y, min_z, max_x, max_y, max_z);
        self
    }

    pub fn min(&self) -> DVec3 {
        DVec3::new(self.min_x, self.min_y, self.min_z)
    }

    pub fn max(&self) -> DVec3 {
        DVec3::new(self.max_x, self.max_y, self.max_z)
    }

    /// Closed-interval overlap on all three axes. Touching faces count.
    pub fn intersects(&self, other: &ContinuousBox) -> bool {
        self.max_x >= other.min_x
            && self.max_y >= other.min_y
            && self.max_z >= other.min_z
            && self.min_x <= other.max_x
            && self.min_y <= other.max_y
            && self.min_z <= other.max_z
    }

    /// Closed-interval containment.
    pub fn contains(&self, p: DVec3) -> bool {
        p.x >= self.min_x
            && p.x <= self.max_x
            && p.y >= self.min_y
            && p.y <= self.max_y
            && p.z >= self.min_z
            && p.z <= self.max_z
    }

    /// Grow to include `p`.
    pub fn expand_to(&mut self, p: DVec3) -> &mut Self {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.min_z = self.min_z.min(p.z);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
        self.max_z = self.max_z.max(p.z);
        self
    }

    pub fn expanded_to(&self, p: DVec3) -> Self {
        let mut b = *self;
        b.expand_to(p);
        b
    }

    /// Grow to include `other`.
    pub fn expand_to_box(&mut self, other: &ContinuousBox) -> &mut Self {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.min_z = self.min_z.min(other.min_z);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
        self.max_z = self.max_z.max(other.max_z);
        self
    }

    pub fn expanded_to_box(&self, other: &ContinuousBox) -> Self {
        let mut b = *self;
        b.expand_to_box(other);
        b
    }

    /// Push every face outward by `amount` (inward if negative; not re-sorted).
    pub fn expand(&mut self, amount: f64) -> &mut Self {
        self.expand_axes(DVec3::splat(amount))
    }

    pub fn expand_axes(&mut self, amounts: DVec3) -> &mut Self {
        self.min_x -= amounts.x;
        self.min_y -= amounts.y;
        self.min_z -= amounts.z;
        self.max_x += amounts.x;
        self.max_y += amounts.y;
        self.max_z += amounts.z;
        self
    }

    pub fn expanded(&self, amount: f64) -> Self {
        self.expanded_axes(DVec3::splat(amount))
    }

    pub fn expanded_axes(&self, amounts: DVec3) -> Self {
        let mut b = *self;
        b.expand_axes(amounts);
        b
    }

    pub fn translate(&mut self, delta: DVec3) -> &mut Self {
        self.min_x += delta.x;
        self.min_y += delta.y;
        self.min_z += delta.z;
        self.max_x += delta.x;
        self.max_y += delta.y;
        self.max_z += delta.z;
        self
    }

    pub fn translated(&self, delta: DVec3) -> Self {
        let mut b = *self;
        b.translate(delta);
        b
    }

    /// Clip to the overlap with `other`. Disjoint inputs leave an inverted box;
    /// check [`intersects`](Self::intersects) first if that matters.
    pub fn intersect(&mut self, other: &ContinuousBox) -> &mut Self {
        self.min_x = self.min_x.max(other.min_x);
        self.min_y = self.min_y.max(other.min_y);
        self.min_z = self.min_z.max(other.min_z);
        self.max_x = self.max_x.min(other.max_x);
        self.max_y = self.max_y.min(other.max_y);
        self.max_z = self.max_z.min(other.max_z);
        self
    }

    pub fn intersection(&self, other: &ContinuousBox) -> Self {
        let mut b = *self;
        b.intersect(other);
        b
    }

    /// The eight corners, bit 0 selecting x, bit 1 y, bit 2 z (clear = min).
    pub fn corners(&self) -> [DVec3; 8] {
        std::array::from_fn(|i| {
            DVec3::new(
                if i & 0b001 == 0 { self.min_x } else { self.max_x },
                if i & 0b010 == 0 { self.min_y } else { self.max_y },
                if i & 0b100 == 0 { self.min_z } else { self.max_z },
            )
        })
    }

    /// Re-fit around the corners mapped through `map`.
    fn refit(&self, map: impl Fn(DVec3) -> DVec3) -> Self {
        let mut out = Self::INVERTED;
        for corner in self.corners() {
            out.expand_to(map(corner));
        }
        out
    }

    /// Axis-aligned box enclosing this box after mapping it local-to-global
    /// through `pose`.
    ///
    /// This is the enclosing AABB of the rotated volume, not the volume
    /// itself: a transform / inverse-transform round trip grows the box
    /// whenever the orientation is not axis-aligned.
    pub fn transformed(&self, pose: &Pose) -> Self {
        self.refit(|c| pose.transform_position(c))
    }

    pub fn transform(&mut self, pose: &Pose) -> &mut Self {
        *self = self.transformed(pose);
        self
    }

    /// Global-to-local counterpart of [`transformed`](Self::transformed).
    pub fn transformed_inverse(&self, pose: &Pose) -> Self {
        self.refit(|c| pose.transform_position_inverse(c))
    }

    pub fn transform_inverse(&mut self, pose: &Pose) -> &mut Self {
        *self = self.transformed_inverse(pose);
        self
    }

    /// Re-fit through an already baked affine matrix
    /// (see [`Pose::bake_into_matrix`]).
    pub fn transformed_by(&self, matrix: &DMat4) -> Self {
        self.refit(|c| matrix.transform_point3(c))
    }

    pub fn center(&self) -> DVec3 {
        (self.min() + self.max()) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max() - self.min()
    }

    /// Product of the extents. Inverted boxes give zero or negative volume.
    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Chunks covered by this box, for 16-unit chunks.
    pub fn chunk_bounds(&self) -> GridBox {
        self.chunk_bounds_with(CHUNK_BITS)
    }

    /// Chunks covered by this box, for `1 << bits`-unit chunks.
    pub fn chunk_bounds_with(&self, bits: u32) -> GridBox {
        self.covered_cells().chunk_bounds_with(bits)
    }

    /// Cells whose interiors the box overlaps. A max bound lying exactly on a
    /// cell face stops short of the cell beyond it; a flat axis keeps the
    /// cell holding its min.
    fn covered_cells(&self) -> GridBox {
        let last = |min: f64, max: f64| {
            let first = min.floor() as i32;
            ((max.ceil() as i32).saturating_sub(1)).max(first)
        };
        GridBox::new(
            self.min_x.floor() as i32,
            self.min_y.floor() as i32,
            self.min_z.floor() as i32,
            last(self.min_x, self.max_x),
            last(self.min_y, self.max_y),
            last(self.min_z, self.max_z),
        )
    }

    /// Grid cells touched by this box: every bound is floored, so a box
    /// ending exactly on a cell face includes that next cell (closed intervals).
    pub fn to_grid_box(&self) -> GridBox {
        GridBox::new(
            self.min_x.floor() as i32,
            self.min_y.floor() as i32,
            self.min_z.floor() as i32,
            self.max_x.floor() as i32,
            self.max_y.floor() as i32,
            self.max_z.floor() as i32,
        )
    }

    /// Flat `[minX, minY, minZ, maxX, maxY, maxZ]` layout.
    pub fn to_array(&self) -> [f64; BOX_LEN] {
        bytemuck::cast(*self)
    }

    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let v = layout::fixed_size(values, BOX_LEN)?;
        Ok(Self::new(v[0], v[1], v[2], v[3], v[4], v[5]))
    }
}

impl From<GridBox> for ContinuousBox {
    fn from(g: GridBox) -> Self {
        g.to_continuous_box()
    }
}

impl fmt::Display for ContinuousBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3}) → ({:.3}, {:.3}, {:.3})",
            self.min_x, self.min_y, self.min_z, self.max_x, self.max_y, self.max_z
        )
    }
}

impl Serialize for ContinuousBox {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_seq(self.to_array())
    }
}

impl<'de> Deserialize<'de> for ContinuousBox {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = Vec::<f64>::deserialize(d)?;
        Self::from_slice(&raw).map_err(serde::de::Error::custom)
    }
}
